//! Reference target model: the capability contract the registry resolves
//! attributes against, and the widget values tag providers construct.
//!
//! A toolkit integration only has to answer two questions per target type:
//! what does it inherit from ([`WidgetKind::parent`]) and which structural
//! capabilities does it add ([`WidgetKind::own_capabilities`]). Everything
//! else is derived once and cached in [`WidgetKind::ancestry`].

use std::fmt;
use std::sync::OnceLock;

use crate::value::{Align, Color, Edges};

// ── Capability ────────────────────────────────────────────────────────────

/// A structural trait a target may implement, usable as an attribute key
/// independently of the concrete type.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Holds a text run (`text` building attribute, default inner text).
    TextBearing,
    /// Takes part in layout (`fillParent`).
    Layout,
    Alignable,
    Disableable,
    /// Has a checked state.
    Toggleable,
    /// Min/max/step/value range.
    RangeValued,
    /// Has inner padding.
    Padded,
    Titled,
}

impl Capability {
    pub const ALL: [Capability; 8] = [
        Capability::TextBearing,
        Capability::Layout,
        Capability::Alignable,
        Capability::Disableable,
        Capability::Toggleable,
        Capability::RangeValued,
        Capability::Padded,
        Capability::Titled,
    ];

    #[inline]
    const fn bit(self) -> u16 {
        1 << self as u16
    }
}

/// Bitset of [`Capability`] values.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Capabilities(u16);

impl Capabilities {
    pub const NONE: Self = Self(0);

    pub const fn of(caps: &[Capability]) -> Self {
        let mut bits = 0;
        let mut i = 0;
        while i < caps.len() {
            bits |= caps[i].bit();
            i += 1;
        }
        Self(bits)
    }

    #[inline]
    pub const fn contains(self, cap: Capability) -> bool {
        self.0 & cap.bit() != 0
    }

    #[inline]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub fn iter(self) -> impl Iterator<Item = Capability> {
        Capability::ALL.into_iter().filter(move |c| self.contains(*c))
    }
}

// ── WidgetKind ────────────────────────────────────────────────────────────

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum WidgetKind {
    Actor,
    Group,
    Label,
    Image,
    TextField,
    TextArea,
    ProgressBar,
    Slider,
    Container,
    ScrollPane,
    Stack,
    HorizontalGroup,
    VerticalGroup,
    Table,
    Button,
    TextButton,
    CheckBox,
    Window,
}

impl WidgetKind {
    pub const ALL: [WidgetKind; 18] = [
        WidgetKind::Actor,
        WidgetKind::Group,
        WidgetKind::Label,
        WidgetKind::Image,
        WidgetKind::TextField,
        WidgetKind::TextArea,
        WidgetKind::ProgressBar,
        WidgetKind::Slider,
        WidgetKind::Container,
        WidgetKind::ScrollPane,
        WidgetKind::Stack,
        WidgetKind::HorizontalGroup,
        WidgetKind::VerticalGroup,
        WidgetKind::Table,
        WidgetKind::Button,
        WidgetKind::TextButton,
        WidgetKind::CheckBox,
        WidgetKind::Window,
    ];

    pub fn name(self) -> &'static str {
        match self {
            WidgetKind::Actor => "actor",
            WidgetKind::Group => "group",
            WidgetKind::Label => "label",
            WidgetKind::Image => "image",
            WidgetKind::TextField => "textField",
            WidgetKind::TextArea => "textArea",
            WidgetKind::ProgressBar => "progressBar",
            WidgetKind::Slider => "slider",
            WidgetKind::Container => "container",
            WidgetKind::ScrollPane => "scrollPane",
            WidgetKind::Stack => "stack",
            WidgetKind::HorizontalGroup => "horizontalGroup",
            WidgetKind::VerticalGroup => "verticalGroup",
            WidgetKind::Table => "table",
            WidgetKind::Button => "button",
            WidgetKind::TextButton => "textButton",
            WidgetKind::CheckBox => "checkBox",
            WidgetKind::Window => "window",
        }
    }

    /// Direct supertype. `Actor` is the root of the hierarchy.
    pub fn parent(self) -> Option<WidgetKind> {
        use WidgetKind::*;
        match self {
            Actor => None,
            Group | Label | Image | TextField | ProgressBar => Some(Actor),
            TextArea => Some(TextField),
            Slider => Some(ProgressBar),
            Container | ScrollPane | Stack | HorizontalGroup | VerticalGroup | Table => Some(Group),
            Button | Window => Some(Table),
            TextButton => Some(Button),
            CheckBox => Some(TextButton),
        }
    }

    /// Capabilities this kind adds on top of its parent.
    pub fn own_capabilities(self) -> Capabilities {
        use Capability::*;
        match self {
            WidgetKind::Actor | WidgetKind::Group => Capabilities::NONE,
            WidgetKind::Label => Capabilities::of(&[TextBearing, Layout, Alignable]),
            WidgetKind::Image => Capabilities::of(&[Layout, Alignable]),
            WidgetKind::TextField => Capabilities::of(&[TextBearing, Layout, Alignable, Disableable]),
            WidgetKind::ProgressBar => Capabilities::of(&[RangeValued, Layout, Disableable]),
            WidgetKind::Container => Capabilities::of(&[Layout, Padded, Alignable]),
            WidgetKind::ScrollPane | WidgetKind::Stack => Capabilities::of(&[Layout]),
            WidgetKind::HorizontalGroup | WidgetKind::VerticalGroup => Capabilities::of(&[Layout, Padded]),
            WidgetKind::Table => Capabilities::of(&[Layout, Padded, Alignable]),
            WidgetKind::Button => Capabilities::of(&[Disableable, Toggleable]),
            WidgetKind::TextButton => Capabilities::of(&[TextBearing]),
            WidgetKind::Window => Capabilities::of(&[Titled]),
            WidgetKind::TextArea | WidgetKind::Slider | WidgetKind::CheckBox => Capabilities::NONE,
        }
    }

    /// All capabilities, inherited ones included.
    pub fn capabilities(self) -> Capabilities {
        let inherited = self.parent().map(WidgetKind::capabilities).unwrap_or_default();
        inherited.union(self.own_capabilities())
    }

    #[inline]
    pub fn has(self, cap: Capability) -> bool {
        self.capabilities().contains(cap)
    }

    pub fn is_a(self, other: WidgetKind) -> bool {
        let mut kind = Some(self);
        while let Some(k) = kind {
            if k == other {
                return true;
            }
            kind = k.parent();
        }
        false
    }

    /// Lookup keys from most to least specific: the concrete chain below
    /// `Actor`, then every capability, then `Actor` itself.
    ///
    /// Computed once per process; attribute resolution is a linear scan
    /// over this slice.
    pub fn ancestry(self) -> &'static [TargetKey] {
        static TABLE: OnceLock<Vec<Vec<TargetKey>>> = OnceLock::new();
        let table = TABLE.get_or_init(|| WidgetKind::ALL.iter().map(|k| k.compute_ancestry()).collect());
        &table[self as usize]
    }

    fn compute_ancestry(self) -> Vec<TargetKey> {
        let mut keys = Vec::new();
        let mut kind = Some(self);
        while let Some(k) = kind.filter(|k| *k != WidgetKind::Actor) {
            keys.push(TargetKey::Kind(k));
            kind = k.parent();
        }
        keys.extend(self.capabilities().iter().map(TargetKey::Capability));
        keys.push(TargetKey::Kind(WidgetKind::Actor));
        keys
    }

    /// Child policy of a freshly constructed widget of this kind.
    fn empty_content(self) -> Content {
        use WidgetKind::*;
        match self {
            Group | Stack | HorizontalGroup | VerticalGroup => Content::Children(Vec::new()),
            Container | ScrollPane => Content::Single(None),
            Table | Button | TextButton | CheckBox | Window => Content::Table(self::Table::default()),
            Actor | Label | Image | TextField | TextArea | ProgressBar | Slider => Content::Leaf,
        }
    }
}

impl fmt::Display for WidgetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ── TargetKey ─────────────────────────────────────────────────────────────

/// What an attribute processor is registered against.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TargetKey {
    Kind(WidgetKind),
    Capability(Capability),
    /// Listener pseudo-targets created by listener tags.
    Listener,
}

impl fmt::Display for TargetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetKey::Kind(kind) => write!(f, "{kind}"),
            TargetKey::Capability(cap) => write!(f, "{cap:?} targets"),
            TargetKey::Listener => f.write_str("listener"),
        }
    }
}

// ── Listener ──────────────────────────────────────────────────────────────

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ListenerEvent {
    Click,
    Change,
    Show,
}

/// A behavior attached to a widget: run `action` when `event` happens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listener {
    pub event: ListenerEvent,
    pub action: Option<String>,
    /// Other named targets the listener also reacts to.
    pub ids: Vec<String>,
    /// Keep the listener after its first invocation.
    pub keep: bool,
}

impl Listener {
    pub fn new(event: ListenerEvent) -> Self {
        Self { event, action: None, ids: Vec::new(), keep: true }
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }
}

// ── Table ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct CellProps {
    pub pad: Edges,
    pub colspan: usize,
    pub expand_x: bool,
    pub expand_y: bool,
    pub fill_x: bool,
    pub fill_y: bool,
    pub align: Option<Align>,
    pub width: Option<f32>,
    pub height: Option<f32>,
    /// The cell closes its row.
    pub end_row: bool,
}

impl Default for CellProps {
    fn default() -> Self {
        Self {
            pad: Edges::default(),
            colspan: 1,
            expand_x: false,
            expand_y: false,
            fill_x: false,
            fill_y: false,
            align: None,
            width: None,
            height: None,
            end_row: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub props: CellProps,
    pub widget: Widget,
}

/// Row-major grid of cells plus the defaults new cells start from.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub rows: Vec<Vec<Cell>>,
    pub defaults: CellProps,
}

impl Default for Table {
    fn default() -> Self {
        Self { rows: vec![Vec::new()], defaults: CellProps::default() }
    }
}

impl Table {
    /// Appends a cell to the current row; `props.end_row` starts a new one.
    pub fn add(&mut self, widget: Widget, props: CellProps) {
        let end_row = props.end_row;
        if self.rows.is_empty() {
            self.rows.push(Vec::new());
        }
        if let Some(row) = self.rows.last_mut() {
            row.push(Cell { props, widget });
        }
        if end_row {
            self.rows.push(Vec::new());
        }
    }

    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.rows.iter().flatten()
    }

    /// Rows that hold at least one cell.
    pub fn row_count(&self) -> usize {
        self.rows.iter().filter(|r| !r.is_empty()).count()
    }
}

// ── Content ───────────────────────────────────────────────────────────────

/// How a widget holds children. Picked per kind by the tag provider.
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    Leaf,
    Single(Option<Box<Widget>>),
    Children(Vec<Widget>),
    Table(Table),
}

// ── Widget ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Range {
    pub min: f32,
    pub max: f32,
    pub step: f32,
    pub value: f32,
}

/// A constructed target.
#[derive(Debug, Clone, PartialEq)]
pub struct Widget {
    kind: WidgetKind,
    pub id: Option<String>,
    pub style: String,
    pub text: Option<String>,
    pub title: Option<String>,
    pub color: Option<Color>,
    pub visible: bool,
    pub disabled: bool,
    pub checked: bool,
    pub fill_parent: bool,
    pub padding: Edges,
    pub align: Option<Align>,
    pub vertical: bool,
    pub range: Option<Range>,
    pub wrap: bool,
    pub spacing: f32,
    pub modal: bool,
    pub movable: bool,
    pub scrolling_disabled: bool,
    pub listeners: Vec<Listener>,
    pub content: Content,
}

impl Widget {
    pub fn new(kind: WidgetKind) -> Self {
        Self {
            kind,
            id: None,
            style: "default".to_string(),
            text: None,
            title: None,
            color: None,
            visible: true,
            disabled: false,
            checked: false,
            fill_parent: false,
            padding: Edges::default(),
            align: None,
            vertical: false,
            range: None,
            wrap: false,
            spacing: 0.0,
            modal: false,
            movable: true,
            scrolling_disabled: false,
            listeners: Vec::new(),
            content: kind.empty_content(),
        }
    }

    pub fn label(text: impl Into<String>) -> Self {
        let mut label = Self::new(WidgetKind::Label);
        label.text = Some(text.into());
        label
    }

    #[inline]
    pub fn kind(&self) -> WidgetKind {
        self.kind
    }

    #[inline]
    pub fn has(&self, cap: Capability) -> bool {
        self.kind.has(cap)
    }

    pub fn table(&self) -> Option<&Table> {
        match &self.content {
            Content::Table(table) => Some(table),
            _ => None,
        }
    }

    pub fn table_mut(&mut self) -> Option<&mut Table> {
        match &mut self.content {
            Content::Table(table) => Some(table),
            _ => None,
        }
    }

    /// Direct children in document order, whatever the content policy.
    pub fn children(&self) -> Vec<&Widget> {
        match &self.content {
            Content::Leaf | Content::Single(None) => Vec::new(),
            Content::Single(Some(child)) => vec![child.as_ref()],
            Content::Children(children) => children.iter().collect(),
            Content::Table(table) => table.cells().map(|c| &c.widget).collect(),
        }
    }

    /// Depth-first search for a widget with the given id, `self` included.
    pub fn find(&self, id: &str) -> Option<&Widget> {
        if self.id.as_deref() == Some(id) {
            return Some(self);
        }
        self.children().into_iter().find_map(|child| child.find(id))
    }

    /// Number of widgets in this subtree, `self` included.
    pub fn count(&self) -> usize {
        1 + self.children().iter().map(|c| c.count()).sum::<usize>()
    }

    pub fn listeners_for(&self, event: ListenerEvent) -> impl Iterator<Item = &Listener> {
        self.listeners.iter().filter(move |l| l.event == event)
    }

    fn fmt_outline(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        write!(f, "{:indent$}{}", "", self.kind, indent = depth * 2)?;
        if let Some(id) = &self.id {
            write!(f, "#{id}")?;
        }
        if let Some(text) = &self.text {
            write!(f, " {text:?}")?;
        }
        if let Some(title) = &self.title {
            write!(f, " title={title:?}")?;
        }
        if let Some(range) = &self.range {
            write!(f, " [{}..{} step {} = {}]", range.min, range.max, range.step, range.value)?;
        }
        for listener in &self.listeners {
            write!(f, " on{:?}", listener.event)?;
            if let Some(action) = &listener.action {
                write!(f, "={action}")?;
            }
        }
        writeln!(f)?;
        for child in self.children() {
            child.fmt_outline(f, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for Widget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_outline(f, 0)
    }
}

// ── Target ────────────────────────────────────────────────────────────────

/// Whatever a tag provider constructs.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    Widget(Widget),
    /// Listener tags do not build a visible widget.
    Listener(Listener),
}

impl Target {
    pub fn ancestry(&self) -> &'static [TargetKey] {
        match self {
            Target::Widget(widget) => widget.kind().ancestry(),
            Target::Listener(_) => &[TargetKey::Listener],
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Target::Widget(widget) => widget.kind().name().to_string(),
            Target::Listener(listener) => format!("{:?} listener", listener.event),
        }
    }

    pub fn as_widget(&self) -> Option<&Widget> {
        match self {
            Target::Widget(widget) => Some(widget),
            Target::Listener(_) => None,
        }
    }

    pub fn as_widget_mut(&mut self) -> Option<&mut Widget> {
        match self {
            Target::Widget(widget) => Some(widget),
            Target::Listener(_) => None,
        }
    }
}
