//! Immutable screen description compiled into a cell buffer every tick.
//!
//! The dashboard never patches a previous frame. It builds a fresh [`Node`]
//! tree from the snapshot, paints it into an empty [`Buffer`], and leaves it to
//! the terminal to flush only the cells that differ from what is on screen.

use ratatui::buffer::Buffer;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::Style;
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, Widget};

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// A single row of styled spans.
    Text(Line<'static>),
    /// A bordered box with a title around one body node.
    Panel(Panel),
    /// Children stacked top to bottom, each at its own height.
    Stack(Vec<Node>),
    /// Children side by side, sized by percentage of the width.
    Columns(Vec<Column>),
    Spacer(u16),
    /// Inside a stack, takes every row its siblings leave over, so the
    /// siblings after it stay pinned to the bottom edge.
    Fill(Box<Node>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    pub title: String,
    pub title_style: Style,
    pub border_style: Style,
    pub body: Box<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub percent: u16,
    pub node: Node,
}

impl Node {
    pub fn text(line: impl Into<Line<'static>>) -> Self {
        Self::Text(line.into())
    }

    pub fn panel(title: impl Into<String>, title_style: Style, border_style: Style, body: Node) -> Self {
        Self::Panel(Panel {
            title: title.into(),
            title_style,
            border_style,
            body: Box::new(body),
        })
    }

    pub fn column(percent: u16, node: Node) -> Column {
        Column { percent, node }
    }

    pub fn fill(node: Node) -> Self {
        Self::Fill(Box::new(node))
    }

    /// Rows this node asks for. Columns take the height of their tallest child.
    pub fn height(&self) -> u16 {
        match self {
            Self::Text(_) => 1,
            Self::Spacer(rows) => *rows,
            Self::Panel(panel) => panel.body.height().saturating_add(2),
            Self::Fill(body) => body.height(),
            Self::Stack(children) => children
                .iter()
                .fold(0u16, |total, child| total.saturating_add(child.height())),
            Self::Columns(columns) => columns
                .iter()
                .map(|column| column.node.height())
                .max()
                .unwrap_or(0),
        }
    }
}

/// Paints `node` into `area`, clipped to the buffer. Children that do not fit
/// are cut off at the bottom edge.
pub fn paint(node: &Node, area: Rect, buf: &mut Buffer) {
    let area = area.intersection(buf.area);
    if area.is_empty() {
        return;
    }
    match node {
        Node::Text(line) => {
            buf.set_line(area.x, area.y, line, area.width);
        }
        Node::Spacer(_) => {}
        Node::Fill(body) => paint(body, area, buf),
        Node::Panel(panel) => {
            let block = Block::default()
                .borders(Borders::ALL)
                .border_style(panel.border_style)
                .title(Line::styled(format!(" {} ", panel.title), panel.title_style));
            let inner = block.inner(area);
            block.render(area, buf);
            paint(&panel.body, inner, buf);
        }
        Node::Stack(children) if children.iter().any(|child| matches!(child, Node::Fill(_))) => {
            let constraints = children.iter().map(|child| match child {
                Node::Fill(_) => Constraint::Fill(1),
                other => Constraint::Length(other.height()),
            });
            let rects = Layout::vertical(constraints).split(area);
            for (child, rect) in children.iter().zip(rects.iter()) {
                paint(child, *rect, buf);
            }
        }
        Node::Stack(children) => {
            let bottom = area.bottom();
            let mut y = area.y;
            for child in children {
                if y >= bottom {
                    break;
                }
                let height = child.height().min(bottom - y);
                paint(child, Rect::new(area.x, y, area.width, height), buf);
                y += height;
            }
        }
        Node::Columns(columns) => {
            let rects = Layout::horizontal(
                columns
                    .iter()
                    .map(|column| Constraint::Percentage(column.percent)),
            )
            .split(area);
            for (column, rect) in columns.iter().zip(rects.iter()) {
                paint(&column.node, *rect, buf);
            }
        }
    }
}

pub fn render_to_buffer(node: &Node, width: u16, height: u16) -> Buffer {
    let area = Rect::new(0, 0, width, height);
    let mut buf = Buffer::empty(area);
    paint(node, area, &mut buf);
    buf
}

/// Plain-text view of a frame, one line per row, styles dropped.
pub fn buffer_to_string(buf: &Buffer) -> String {
    let area = buf.area;
    let mut out = String::new();
    for y in area.top()..area.bottom() {
        for x in area.left()..area.right() {
            out.push_str(buf[(x, y)].symbol());
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{buffer_to_string, render_to_buffer, Node};
    use ratatui::style::Style;

    fn panel(title: &str, rows: &[&str]) -> Node {
        Node::panel(
            title,
            Style::default(),
            Style::default(),
            Node::Stack(rows.iter().map(|row| Node::text(row.to_string())).collect()),
        )
    }

    #[test]
    fn heights_compose() {
        let tree = Node::Stack(vec![
            Node::text("header"),
            Node::Spacer(2),
            Node::Columns(vec![
                Node::column(50, panel("left", &["a", "b", "c"])),
                Node::column(50, panel("right", &["a"])),
            ]),
        ]);
        assert_eq!(tree.height(), 1 + 2 + 5);
    }

    #[test]
    fn panels_draw_borders_and_titles() {
        let frame = buffer_to_string(&render_to_buffer(&panel("Queue", &["one"]), 12, 3));
        let lines = frame.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains(" Queue "));
        assert!(lines[1].contains("one"));
        assert!(lines[2].starts_with('└'));
    }

    #[test]
    fn stack_clips_at_the_bottom_edge() {
        let tree = Node::Stack((0..10).map(|i| Node::text(format!("row {i}"))).collect());
        let frame = buffer_to_string(&render_to_buffer(&tree, 8, 3));
        assert!(frame.contains("row 2"));
        assert!(!frame.contains("row 3"));
    }

    #[test]
    fn fill_pins_the_rows_after_it_to_the_bottom() {
        let tree = Node::Stack(vec![
            Node::text("top"),
            Node::fill(Node::Stack((0..10).map(|i| Node::text(format!("body {i}"))).collect())),
            Node::text("footer"),
        ]);
        let frame = buffer_to_string(&render_to_buffer(&tree, 8, 5));
        let lines = frame.lines().collect::<Vec<_>>();
        assert_eq!(lines[0], "top     ");
        assert_eq!(lines[3], "body 2  ");
        assert_eq!(lines[4], "footer  ");

        let tall = buffer_to_string(&render_to_buffer(&tree, 8, 20));
        assert_eq!(tall.lines().nth(19), Some("footer  "));
    }

    #[test]
    fn degenerate_areas_do_not_panic() {
        let tree = Node::Columns(vec![
            Node::column(50, panel("a", &["x"])),
            Node::column(50, panel("b", &["y"])),
        ]);
        assert_eq!(buffer_to_string(&render_to_buffer(&tree, 0, 0)), "");
        assert_eq!(buffer_to_string(&render_to_buffer(&tree, 1, 1)).chars().count(), 2);
    }

    #[test]
    fn text_is_clipped_to_the_width() {
        let frame = buffer_to_string(&render_to_buffer(&Node::text("abcdefgh"), 4, 1));
        assert_eq!(frame, "abcd\n");
    }
}
