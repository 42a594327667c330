/// 畫面節點，結構比照網頁上的 div / span
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Node {
    pub tag: &'static str,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub text: String,
    /// 點擊後開啟的網址
    pub href: Option<String>,
    pub children: Vec<Node>,
}

impl Node {
    pub fn div(class: &str) -> Self {
        Node {
            tag: "div",
            classes: vec![class.to_string()],
            ..Default::default()
        }
    }

    pub fn span(text: impl Into<String>) -> Self {
        Node {
            tag: "span",
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn with_class(mut self, class: &str) -> Self {
        self.classes.push(class.to_string());
        self
    }

    pub fn with_href(mut self, href: String) -> Self {
        self.href = Some(href);
        self
    }

    pub fn push(&mut self, child: Node) {
        self.children.push(child);
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    /// 包含自己在內的節點總數
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(Node::count).sum::<usize>()
    }

    /// 依序串接所有文字
    pub fn text_content(&self) -> String {
        let mut text = self.text.clone();
        for child in &self.children {
            text.push_str(&child.text_content());
        }
        text
    }

    /// 找出第一個帶有指定類別的子孫節點
    pub fn find_class(&self, class: &str) -> Option<&Node> {
        if self.has_class(class) {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find_class(class))
    }

    pub fn remove_children(&mut self) {
        self.children.clear();
    }
}
