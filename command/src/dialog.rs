//! Dialogs in the client's line-based markup.
//!
//! ```text
//! set_default_color|`o
//! add_label_with_icon|big|`wTitle``|left|5956|
//! add_spacer|small|
//! add_textbox|Some text|left|
//! add_smalltext|Smaller text|left|
//! end_dialog|name|Cancel||
//! ```

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Size {
    Small,
    Big,
}

impl Size {
    fn keyword(self) -> &'static str {
        match self {
            Size::Small => "small",
            Size::Big => "big",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
}

impl Align {
    fn keyword(self) -> &'static str {
        match self {
            Align::Left => "left",
            Align::Right => "right",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    Label { text: String, icon: Option<u32>, align: Align, size: Size },
    Spacer(Size),
    TextBox(String),
    SmallText(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct End {
    name: String,
    cancel: String,
    ok: String,
}

/// An ordered list of display fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dialog {
    default_color: Option<char>,
    fields: Vec<Field>,
    end: Option<End>,
}

impl Dialog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn default_color(mut self, color: char) -> Self {
        self.default_color = Some(color);
        self
    }
    pub fn label(mut self, text: impl Into<String>, align: Align, size: Size) -> Self {
        self.fields.push(Field::Label { text: text.into(), icon: None, align, size });
        self
    }
    pub fn label_with_icon(mut self, text: impl Into<String>, icon: u32, align: Align, size: Size) -> Self {
        self.fields.push(Field::Label { text: text.into(), icon: Some(icon), align, size });
        self
    }
    pub fn spacer(mut self, size: Size) -> Self {
        self.fields.push(Field::Spacer(size));
        self
    }
    pub fn textbox(mut self, text: impl Into<String>) -> Self {
        self.fields.push(Field::TextBox(text.into()));
        self
    }
    pub fn smalltext(mut self, text: impl Into<String>) -> Self {
        self.fields.push(Field::SmallText(text.into()));
        self
    }
    pub fn end_dialog(mut self, name: &str, cancel: &str, ok: &str) -> Self {
        self.end = Some(End { name: name.to_owned(), cancel: cancel.to_owned(), ok: ok.to_owned() });
        self
    }

    pub fn render(&self) -> String {
        let mut lines = Vec::with_capacity(self.fields.len() + 2);
        if let Some(color) = self.default_color {
            lines.push(format!("set_default_color|`{}", color));
        }
        for field in &self.fields {
            lines.push(match field {
                Field::Label { text, icon: Some(icon), align, size } => {
                    format!("add_label_with_icon|{}|{}|{}|{}|", size.keyword(), text, align.keyword(), icon)
                },
                Field::Label { text, icon: None, align, size } => {
                    format!("add_label|{}|{}|{}|", size.keyword(), text, align.keyword())
                },
                Field::Spacer(size) => format!("add_spacer|{}|", size.keyword()),
                Field::TextBox(text) => format!("add_textbox|{}|left|", text),
                Field::SmallText(text) => format!("add_smalltext|{}|left|", text),
            });
        }
        if let Some(end) = &self.end {
            lines.push(format!("end_dialog|{}|{}|{}|", end.name, end.cancel, end.ok));
        }
        lines.join("\n")
    }
}
