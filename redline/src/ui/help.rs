//! Help overlay: a centred modal listing every key binding.

use ratatui::{
    Frame,
    layout::Constraint,
    text::{Line, Text},
    widgets::{Block, Clear, Paragraph, Wrap},
};

use crate::theme::Theme;

/// Skipped below 60 columns, where the modal would collapse to nothing.
pub fn render_help_overlay(frame: &mut Frame, theme: &Theme, help_scroll: u16) {
    if frame.area().width < 60 {
        return;
    }

    let overlay_area = frame
        .area()
        .centered(Constraint::Percentage(80), Constraint::Percentage(80));
    frame.render_widget(Clear, overlay_area);

    let block = Block::bordered()
        .title(" Help · j/k scroll, ? or Esc to dismiss ")
        .border_style(ratatui::style::Style::default().fg(theme.border_active));

    frame.render_widget(
        Paragraph::new(build_help_text())
            .block(block)
            .wrap(Wrap { trim: false })
            .scroll((help_scroll, 0)),
        overlay_area,
    );
}

fn build_help_text() -> Text<'static> {
    Text::from(vec![
        Line::from("Navigation"),
        Line::from("  j / k         Move cursor down / up"),
        Line::from("  g / G         Jump to top / bottom"),
        Line::from("  Ctrl-d / u    Half page down / up"),
        Line::from("  Ctrl-f / b    Full page down / up"),
        Line::from("  [ / ]         Previous / next hunk"),
        Line::from("  H / L         Move panel focus left / right"),
        Line::from("  < / >         Shrink / grow the diff panel"),
        Line::from(""),
        Line::from("File List"),
        Line::from("  Enter / l     Jump to the file in the diff"),
        Line::from(""),
        Line::from("Commenting"),
        Line::from("  c / Enter     Start a range on the cursor line, then complete it"),
        Line::from("  click         Same as Enter on the clicked line"),
        Line::from("  Esc           Cancel a range in progress"),
        Line::from("  d             Delete the comment under the cursor (confirm with y)"),
        Line::from(""),
        Line::from("Composer"),
        Line::from("  Tab           Cycle comment type"),
        Line::from("  Enter         Save"),
        Line::from("  Alt-Enter     New line"),
        Line::from("  Esc           Discard"),
        Line::from(""),
        Line::from("Review"),
        Line::from("  R             Edit the review status and summary"),
        Line::from(""),
        Line::from("General"),
        Line::from("  v             Toggle unified / split view"),
        Line::from("  r             Reload the working tree diff"),
        Line::from("  ?             Open / close this help overlay"),
        Line::from("  q             Quit"),
    ])
}
