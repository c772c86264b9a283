use serde::{Deserialize, Serialize};

use crate::geometry::{Point, Rect};
use crate::style::{
    from_config_text, from_property_bag, to_config_text, to_property_bag, PaintStyle, PropertyBag,
    StyleResult,
};

/// Non-owning handle to an item in a [`super::SceneGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(pub(crate) u64);

impl ItemId {
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    pub const fn degrees(self) -> u16 {
        match self {
            Self::Deg0 => 0,
            Self::Deg90 => 90,
            Self::Deg180 => 180,
            Self::Deg270 => 270,
        }
    }

    pub const fn from_degrees(degrees: i32) -> Self {
        match degrees.rem_euclid(360) {
            90 => Self::Deg90,
            180 => Self::Deg180,
            270 => Self::Deg270,
            _ => Self::Deg0,
        }
    }

    pub const fn rotated(self, clockwise: bool) -> Self {
        let step = if clockwise { 90 } else { -90 };
        Self::from_degrees(self.degrees() as i32 + step)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    /// Zero-based page index in the source document.
    pub source_index: u32,
    pub rotation: Rotation,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationInfo {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkTarget {
    Uri(String),
    Page(u32),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetField {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ItemBody {
    Page(PageInfo),
    Rectangle,
    Redaction,
    Square(AnnotationInfo),
    Link(LinkTarget),
    Widget(WidgetField),
}

impl ItemBody {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Page(_) => "page",
            Self::Rectangle => "rectangle",
            Self::Redaction => "redaction",
            Self::Square(_) => "square",
            Self::Link(_) => "link",
            Self::Widget(_) => "widget",
        }
    }

    pub const fn is_page(&self) -> bool {
        matches!(self, Self::Page(_))
    }
}

/// Everything the scene knows about one item apart from its placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemState {
    pub rect: Rect,
    #[serde(default)]
    pub style: Option<PaintStyle>,
    pub body: ItemBody,
}

impl ItemState {
    pub const fn new(rect: Rect, style: Option<PaintStyle>, body: ItemBody) -> Self {
        Self { rect, style, body }
    }

    pub const fn page(source_index: u32, width: f64, height: f64) -> Self {
        Self::new(
            Rect::new(0.0, 0.0, width, height),
            None,
            ItemBody::Page(PageInfo {
                source_index,
                rotation: Rotation::Deg0,
            }),
        )
    }

    pub const fn rectangle(rect: Rect, style: PaintStyle) -> Self {
        Self::new(rect, Some(style), ItemBody::Rectangle)
    }

    pub const fn redaction(rect: Rect, style: PaintStyle) -> Self {
        Self::new(rect, Some(style), ItemBody::Redaction)
    }

    pub const fn square(rect: Rect, style: PaintStyle, info: AnnotationInfo) -> Self {
        Self::new(rect, Some(style), ItemBody::Square(info))
    }

    pub const fn link(rect: Rect, style: PaintStyle, target: LinkTarget) -> Self {
        Self::new(rect, Some(style), ItemBody::Link(target))
    }

    pub const fn widget(rect: Rect, field: WidgetField) -> Self {
        Self::new(rect, None, ItemBody::Widget(field))
    }

    pub fn page_info(&self) -> Option<&PageInfo> {
        match &self.body {
            ItemBody::Page(info) => Some(info),
            _ => None,
        }
    }

    pub(crate) fn page_info_mut(&mut self) -> Option<&mut PageInfo> {
        match &mut self.body {
            ItemBody::Page(info) => Some(info),
            _ => None,
        }
    }

    pub fn annotation(&self) -> Option<&AnnotationInfo> {
        match &self.body {
            ItemBody::Square(info) => Some(info),
            _ => None,
        }
    }

    pub(crate) fn set_annotation(&mut self, info: AnnotationInfo) -> bool {
        match &mut self.body {
            ItemBody::Square(current) => {
                *current = info;
                true
            }
            _ => false,
        }
    }

    /// Widgets expose their field value, squares their note content.
    pub fn text(&self) -> Option<&str> {
        match &self.body {
            ItemBody::Widget(field) => Some(field.value.as_str()),
            ItemBody::Square(info) => Some(info.content.as_str()),
            _ => None,
        }
    }

    pub(crate) fn set_text(&mut self, text: String) -> bool {
        match &mut self.body {
            ItemBody::Widget(field) => {
                field.value = text;
                true
            }
            ItemBody::Square(info) => {
                info.content = text;
                true
            }
            _ => false,
        }
    }

    pub fn to_properties(&self) -> StyleResult<PropertyBag> {
        to_property_bag(self)
    }

    pub fn from_properties(properties: &PropertyBag) -> StyleResult<Self> {
        from_property_bag(properties)
    }

    pub fn to_config_text(&self) -> StyleResult<String> {
        to_config_text(self)
    }

    pub fn from_config_text(text: &str) -> StyleResult<Self> {
        from_config_text(text)
    }
}

pub trait Resizable {
    fn rect(&self) -> Rect;
    fn set_rect(&mut self, rect: Rect);

    fn position(&self) -> Point {
        self.rect().origin()
    }

    fn set_position(&mut self, position: Point) {
        let rect = self.rect().with_origin(position);
        self.set_rect(rect);
    }
}

pub trait Colorable {
    fn style(&self) -> Option<&PaintStyle>;
    /// Returns `false` when the item carries no paint style.
    fn set_style(&mut self, style: PaintStyle) -> bool;
}

/// Produces an offset copy. Never records anything: the caller announces the
/// copy once it is inserted.
pub trait Copyable {
    fn duplicate(&self, offset: f64) -> Option<ItemState>;
}

impl Resizable for ItemState {
    fn rect(&self) -> Rect {
        self.rect
    }

    fn set_rect(&mut self, rect: Rect) {
        self.rect = rect;
    }
}

impl Colorable for ItemState {
    fn style(&self) -> Option<&PaintStyle> {
        self.style.as_ref()
    }

    fn set_style(&mut self, style: PaintStyle) -> bool {
        match (&self.body, &mut self.style) {
            (ItemBody::Page(_) | ItemBody::Widget(_), _) => false,
            (_, slot) => {
                *slot = Some(style);
                true
            }
        }
    }
}

impl Copyable for ItemState {
    fn duplicate(&self, offset: f64) -> Option<ItemState> {
        match self.body {
            ItemBody::Page(_) | ItemBody::Widget(_) => None,
            _ => {
                let mut copy = self.clone();
                copy.rect = copy.rect.translated(offset, offset);
                Some(copy)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rgba;

    #[test]
    fn rotation_steps_wrap_in_both_directions() {
        assert_eq!(Rotation::Deg270.rotated(true), Rotation::Deg0);
        assert_eq!(Rotation::Deg0.rotated(false), Rotation::Deg270);
        assert_eq!(Rotation::Deg90.rotated(true), Rotation::Deg180);
    }

    #[test]
    fn duplicate_offsets_geometry_and_keeps_style() {
        let style = PaintStyle::filled(Rgba::RED, 2.0, Rgba::BLUE);
        let square = ItemState::square(
            Rect::new(10.0, 10.0, 40.0, 40.0),
            style,
            AnnotationInfo::default(),
        );

        let copy = square.duplicate(10.0).expect("squares are copyable");
        assert_eq!(copy.rect, Rect::new(20.0, 20.0, 40.0, 40.0));
        assert_eq!(copy.style, Some(style));
        assert_eq!(copy.body, square.body);
    }

    #[test]
    fn pages_and_widgets_are_not_copyable_or_colorable() {
        let mut page = ItemState::page(0, 612.0, 792.0);
        assert!(page.duplicate(10.0).is_none());
        assert!(!page.set_style(PaintStyle::default()));

        let widget = ItemState::widget(
            Rect::new(0.0, 0.0, 100.0, 20.0),
            WidgetField {
                name: "name".to_string(),
                value: String::new(),
            },
        );
        assert!(widget.duplicate(10.0).is_none());
    }

    #[test]
    fn set_position_moves_rect_origin_only() {
        let mut rect = ItemState::rectangle(Rect::new(0.0, 0.0, 5.0, 6.0), PaintStyle::default());
        rect.set_position(Point::new(100.0, 100.0));
        assert_eq!(rect.rect, Rect::new(100.0, 100.0, 5.0, 6.0));
    }

    #[test]
    fn text_targets_widget_value_and_square_content() {
        let mut widget = ItemState::widget(
            Rect::new(0.0, 0.0, 100.0, 20.0),
            WidgetField {
                name: "email".to_string(),
                value: "a".to_string(),
            },
        );
        assert!(widget.set_text("b@c".to_string()));
        assert_eq!(widget.text(), Some("b@c"));

        let mut redaction = ItemState::redaction(Rect::default(), PaintStyle::default());
        assert!(!redaction.set_text("x".to_string()));
        assert_eq!(redaction.text(), None);
    }

    #[test]
    fn item_state_property_bag_restores_item() {
        let link = ItemState::link(
            Rect::new(1.0, 2.0, 3.0, 4.0),
            PaintStyle::stroke(Rgba::BLUE, 1.0),
            LinkTarget::Uri("https://example.org".to_string()),
        );
        let bag = link.to_properties().expect("item should serialize");
        assert!(bag.contains_key("rect"));
        assert!(bag.contains_key("style"));

        let restored = ItemState::from_properties(&bag).expect("bag should parse");
        assert_eq!(restored, link);

        let text = link.to_config_text().expect("item should serialize as text");
        let from_text = ItemState::from_config_text(&text).expect("text should parse");
        assert_eq!(from_text, link);
    }
}
