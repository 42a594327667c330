//! 將報價轉成畫面節點。
//!
//! 每次刷新都把 `stocks` 容器整個清空後重建，不做差異比對，
//! 因此同樣的資料畫兩次，節點數量一定相同。

use crate::{
    declare::{Direction, IndicatorSnapshot, RenderRecord, Signal},
    error::WatcherError,
    event::status::StatusLine,
    logging,
    util::{datetime, opener, text},
};

pub mod node;
pub mod terminal;

pub use node::Node;
pub use terminal::Screen;

/// 放置所有商品節點的容器 id
pub const SURFACE_ID: &str = "stocks";

pub struct Presenter {
    surface: Node,
    status: Option<StatusLine>,
    screen: Box<dyn Screen>,
}

impl Presenter {
    pub fn new(screen: Box<dyn Screen>) -> Self {
        Presenter {
            surface: Node::div("stocks").with_id(SURFACE_ID),
            status: None,
            screen,
        }
    }

    /// 清空後依序重建所有商品節點
    pub fn render(&mut self, records: &[RenderRecord]) {
        self.surface.remove_children();
        for record in records {
            self.surface.push(create_node(record));
        }
        self.paint();
    }

    pub fn update_status(&mut self, status: StatusLine) {
        self.status = Some(status);
        self.paint();
    }

    pub fn surface(&self) -> &Node {
        &self.surface
    }

    fn paint(&mut self) {
        if let Err(why) = self.screen.paint(&self.surface, self.status.as_ref()) {
            let why = WatcherError::Render(format!("Failed to paint the screen because {:?}", why));
            logging::error_file_async(why.to_string());
        }
    }
}

/// 單一商品的完整區塊
pub fn create_node(record: &RenderRecord) -> Node {
    let mut node = Node::div("stock").with_id(&record.instrument.id);

    node.push(render_header(record));
    node.push(render_last_transaction(record));
    if let Some(volume) = render_volume(record) {
        node.push(volume);
    }
    if let Some(indicators) = &record.indicators {
        node.push(render_signals(indicators));
        node.push(render_summary(indicators));
    }

    node
}

fn render_header(record: &RenderRecord) -> Node {
    let snapshot = &record.snapshot;
    let mut node = Node::div("header");
    node.push(
        Node::span(snapshot.display_name.as_str())
            .with_class("link")
            .with_href(opener::quote_page_url(&snapshot.external_link_id)),
    );
    node.push(render_price(record));
    node
}

fn render_price(record: &RenderRecord) -> Node {
    let snapshot = &record.snapshot;
    let change = snapshot.percent_change();
    let direction = Direction::from_change(change);

    let mut node = Node::span("").with_class("price");
    node.push(Node::span(
        text::currency_format(Some(snapshot.current_price)).unwrap_or_default(),
    ));
    node.push(Node::span(direction.marker()).with_class(direction.as_ref()));
    node.push(
        Node::span(text::percent_format(change))
            .with_class(direction.as_ref())
            .with_class("change-indicator"),
    );
    node
}

fn render_last_transaction(record: &RenderRecord) -> Node {
    key_value(
        "last-transaction",
        "last transaction: ",
        datetime::format_unix(record.snapshot.last_transaction_time),
    )
}

/// 成交值為零或缺少時整個區塊省略
fn render_volume(record: &RenderRecord) -> Option<Node> {
    text::currency_format(record.snapshot.volume_value)
        .map(|volume| key_value("volume", "volume: ", volume))
}

fn render_signals(indicators: &IndicatorSnapshot) -> Node {
    let mut node = Node::div("signals");
    node.push(Node::span("signals: "));
    for signal in indicators.signals() {
        render_signal(&mut node, signal);
    }
    node
}

fn render_signal(parent: &mut Node, signal: &Signal) {
    parent.push(Node::span(format!("{}: ", signal.name)).with_class("signal"));
    parent.push(
        Node::span(signal.value.as_str())
            .with_class(signal.direction().as_ref())
            .with_class("padding-right"),
    );
}

fn render_summary(indicators: &IndicatorSnapshot) -> Node {
    let summary = &indicators.summary;
    let mut node = Node::div("summary");
    node.push(Node::span("summary: "));
    node.push(
        Node::span(summary.action_name.as_str()).with_class(summary.direction().as_ref()),
    );

    let mut counts = Node::span("").with_class("counts");
    counts.push(Node::span("  ( "));
    counts.push(Node::span(summary.buy.to_string()).with_class(Direction::Up.as_ref()));
    counts.push(Node::span(" / "));
    counts.push(Node::span(summary.neutral.to_string()).with_class(Direction::NoChange.as_ref()));
    counts.push(Node::span(" / "));
    counts.push(Node::span(summary.sell.to_string()).with_class(Direction::Down.as_ref()));
    counts.push(Node::span(" )"));
    node.push(counts);

    node
}

fn key_value(class: &str, label: &str, value: String) -> Node {
    let mut node = Node::div(class);
    node.push(Node::span(label).with_class("key"));
    node.push(Node::span(value).with_class("value"));
    node
}
