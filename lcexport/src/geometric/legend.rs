//! Categorical legend panel.
//!
//! The legend is plain data: a panel of label widgets built in one pass from a
//! [`CategoryDictionary`]. Attaching it to a map is the caller's business
//! (see [`MapView::add`](crate::geometric::map_display::MapView::add)), and
//! it can be rendered to HTML for a web map page.

use serde::Serialize;
use std::fmt::Write;

use crate::commons::color::HexColor;
use crate::geometric::land_cover::CategoryDictionary;

pub const LOADING_TEXT: &str = "Loading legend...";

/// Screen anchor of an overlay panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Position {
    TopLeft,
    TopCenter,
    TopRight,
    MiddleLeft,
    MiddleRight,
    BottomLeft,
    BottomCenter,
    BottomRight,
}

impl Position {
    /// Absolute-positioning CSS for an overlay on a relatively positioned map container
    fn css(self) -> &'static str {
        match self {
            Position::TopLeft => "position: absolute; top: 8px; left: 8px",
            Position::TopCenter => "position: absolute; top: 8px; left: 50%; transform: translateX(-50%)",
            Position::TopRight => "position: absolute; top: 8px; right: 8px",
            Position::MiddleLeft => "position: absolute; top: 50%; left: 8px; transform: translateY(-50%)",
            Position::MiddleRight => "position: absolute; top: 50%; right: 8px; transform: translateY(-50%)",
            Position::BottomLeft => "position: absolute; bottom: 8px; left: 8px",
            Position::BottomCenter => "position: absolute; bottom: 8px; left: 50%; transform: translateX(-50%)",
            Position::BottomRight => "position: absolute; bottom: 8px; right: 8px",
        }
    }
}

/// Widget style properties
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Style {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub padding: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub margin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_weight: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<HexColor>,
    pub shown: bool,
}

impl Default for Style {
    fn default() -> Self {
        Style {
            position: None,
            padding: None,
            margin: None,
            font_weight: None,
            font_size: None,
            background_color: None,
            shown: true,
        }
    }
}

impl Style {
    pub fn to_css(&self) -> String {
        let mut decls: Vec<String> = Vec::new();
        if let Some(position) = self.position {
            decls.push(position.css().to_string());
        }
        if let Some(ref padding) = self.padding {
            decls.push(format!("padding: {}", padding));
        }
        if let Some(ref margin) = self.margin {
            decls.push(format!("margin: {}", margin));
        }
        if let Some(ref weight) = self.font_weight {
            decls.push(format!("font-weight: {}", weight));
        }
        if let Some(ref size) = self.font_size {
            decls.push(format!("font-size: {}", size));
        }
        if let Some(ref color) = self.background_color {
            decls.push(format!("background-color: {}", color));
        }
        if !self.shown {
            decls.push("display: none".to_string());
        }
        decls.join("; ")
    }
}

/// Child layout of a panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    Vertical,
    Horizontal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Label {
    pub value: Option<String>,
    pub style: Style,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Panel {
    pub widgets: Vec<Widget>,
    pub layout: Layout,
    pub style: Style,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Widget {
    Label(Label),
    Panel(Panel),
}

impl Widget {
    pub fn as_label(&self) -> Option<&Label> {
        match self {
            Widget::Label(label) => Some(label),
            Widget::Panel(_) => None,
        }
    }

    pub fn as_panel(&self) -> Option<&Panel> {
        match self {
            Widget::Panel(panel) => Some(panel),
            Widget::Label(_) => None,
        }
    }

    fn write_html(&self, out: &mut String) {
        match self {
            Widget::Label(label) => {
                let _ = write!(
                    out,
                    r#"<div class="lc-label" style="{}">{}</div>"#,
                    escape_html(&label.style.to_css()),
                    escape_html(label.value.as_deref().unwrap_or(""))
                );
            }
            Widget::Panel(panel) => panel.write_html(out),
        }
    }
}

impl Panel {
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        let direction = match self.layout {
            Layout::Vertical => "column",
            Layout::Horizontal => "row",
        };
        let mut css = format!("display: flex; flex-direction: {}", direction);
        let extra = self.style.to_css();
        if !extra.is_empty() {
            css.push_str("; ");
            css.push_str(&extra);
        }
        let _ = write!(out, r#"<div class="lc-panel" style="{}">"#, escape_html(&css));
        for child in &self.widgets {
            child.write_html(out);
        }
        out.push_str("</div>");
    }
}

/// One legend entry as read back from the panel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LegendRow<'a> {
    pub color: &'a HexColor,
    pub name: &'a str,
}

/// A built legend: title, hidden loading placeholder, then one row per category
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Legend {
    panel: Panel,
}

impl Legend {
    pub fn panel(&self) -> &Panel {
        &self.panel
    }

    pub fn into_panel(self) -> Panel {
        self.panel
    }

    pub fn title(&self) -> Option<&Label> {
        self.panel.widgets.first().and_then(Widget::as_label)
    }

    pub fn loading(&self) -> Option<&Label> {
        self.panel.widgets.get(1).and_then(Widget::as_label)
    }

    pub fn rows(&self) -> Vec<LegendRow<'_>> {
        self.panel
            .widgets
            .iter()
            .skip(2)
            .filter_map(|w| {
                let row = w.as_panel()?;
                let color = row.widgets.first()?.as_label()?.style.background_color.as_ref()?;
                let name = row.widgets.get(1)?.as_label()?.value.as_deref()?;
                Some(LegendRow { color, name })
            })
            .collect()
    }

    pub fn to_html(&self) -> String {
        self.panel.to_html()
    }
}

fn title_label(title: &str) -> Label {
    Label {
        value: Some(title.to_string()),
        style: Style {
            font_weight: Some("bold".to_string()),
            font_size: Some("18px".to_string()),
            margin: Some("0 0 4px 0".to_string()),
            padding: Some("0".to_string()),
            ..Style::default()
        },
    }
}

fn make_row(color: &HexColor, name: &str) -> Widget {
    // The swatch is a label with no text; padding gives it its size.
    let swatch = Label {
        value: None,
        style: Style {
            background_color: Some(color.clone()),
            padding: Some("8px".to_string()),
            margin: Some("0 0 4px 0".to_string()),
            ..Style::default()
        },
    };
    let description = Label {
        value: Some(name.to_string()),
        style: Style {
            margin: Some("0 0 4px 6px".to_string()),
            ..Style::default()
        },
    };
    Widget::Panel(Panel {
        widgets: vec![Widget::Label(swatch), Widget::Label(description)],
        layout: Layout::Horizontal,
        style: Style::default(),
    })
}

/// Build the categorical legend for `dict`, anchored bottom-left
pub fn build_legend(title: &str, dict: &CategoryDictionary) -> Legend {
    let loading = Label {
        value: Some(LOADING_TEXT.to_string()),
        style: Style {
            margin: Some("2px 0 4px 0".to_string()),
            shown: false,
            ..Style::default()
        },
    };

    let mut widgets = Vec::with_capacity(dict.len() + 2);
    widgets.push(Widget::Label(title_label(title)));
    widgets.push(Widget::Label(loading));
    widgets.extend(dict.iter().map(|(color, name)| make_row(color, name)));

    Legend {
        panel: Panel {
            widgets,
            layout: Layout::Vertical,
            style: Style {
                position: Some(Position::BottomLeft),
                padding: Some("8px 15px".to_string()),
                ..Style::default()
            },
        },
    }
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
