use ratatui::layout::{Constraint, Direction, Layout as RatLayout, Rect};

pub struct Layout {
    pub inner_area: Rect, // Area inside the outer border
    pub header_area: Rect,
    pub task_input_area: Rect,
    pub list_area: Rect,
    pub query_area: Rect,
    pub answer_area: Rect,
    pub status_area: Rect,
}

impl Layout {
    /// Minimum terminal dimensions, not counting the outer border.
    /// Height: header + two 3-line inputs' worth of content + status.
    pub const MIN_WIDTH: u16 = 50;
    pub const MIN_HEIGHT: u16 = 12;

    /// Width share of the question/answer column
    const ANSWER_PERCENT: u16 = 45;

    pub fn calculate(size: Rect) -> Self {
        let width = size.width.max(Self::MIN_WIDTH + 2);
        let height = size.height.max(Self::MIN_HEIGHT + 2);
        let size = Rect::new(size.x, size.y, width, height);

        let inner_area = Rect::new(
            size.x + 1,
            size.y + 1,
            size.width.saturating_sub(2),
            size.height.saturating_sub(2),
        );

        let vertical = RatLayout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1), // Signed-in user
                Constraint::Min(1),    // Tasks | questions
                Constraint::Length(1), // Status
            ])
            .split(inner_area);

        let columns = RatLayout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(100 - Self::ANSWER_PERCENT),
                Constraint::Percentage(Self::ANSWER_PERCENT),
            ])
            .split(vertical[1]);

        let left = RatLayout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(1)])
            .split(columns[0]);
        let right = RatLayout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(1)])
            .split(columns[1]);

        Self {
            inner_area,
            header_area: vertical[0],
            task_input_area: left[0],
            list_area: left[1],
            query_area: right[0],
            answer_area: right[1],
            status_area: vertical[2],
        }
    }
}
