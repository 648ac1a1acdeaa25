// SPDX-License-Identifier: GPL-3.0-only

//! Terminal-based camera viewer
//!
//! Renders the preview surface to the terminal using Unicode half-block
//! characters for improved vertical resolution, with a device picker and a
//! settings popup drawn on top.

use crate::app::{AppModel, Message, SettingsField, SettingsPanel};
use crate::backends::camera::types::CameraFrame;
use crate::constants::timing::UI_POLL_INTERVAL;

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Clear, Widget},
};
use std::io::{self, stdout};
use tracing::info;

/// Run the terminal camera viewer until the user quits
pub fn run(mut model: AppModel) -> io::Result<()> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    model.init();
    let result = run_app(&mut terminal, &mut model);
    model.shutdown();

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    model: &mut AppModel,
) -> io::Result<()> {
    while !model.should_quit {
        model.poll_events();

        let (_, frame) = model.preview.latest();
        let frame_widget = FrameWidget {
            frame: frame.as_ref(),
            mirror: model.preview.is_mirrored(),
        };
        let status_message = build_status_message(model);

        terminal.draw(|f| {
            let area = f.area();

            // Reserve bottom line for status
            let camera_area = Rect {
                height: area.height.saturating_sub(1),
                ..area
            };
            f.render_widget(&frame_widget, camera_area);

            let status_area = Rect {
                x: area.x,
                y: area.y + area.height.saturating_sub(1),
                width: area.width,
                height: 1,
            };
            f.render_widget(
                StatusBar {
                    message: &status_message,
                    recording: model.recording.is_recording(),
                },
                status_area,
            );

            if let Some(highlight) = model.device_picker {
                f.render_widget(
                    DevicePicker {
                        names: model.devices.iter().map(|d| d.name.as_str()).collect(),
                        highlight,
                        current: model.current_device,
                    },
                    camera_area,
                );
            }

            if let Some(panel) = &model.settings_panel {
                f.render_widget(SettingsPopup { panel }, camera_area);
            }
        })?;

        if event::poll(UI_POLL_INTERVAL)?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
            && let Some(message) = map_key(model, key)
        {
            model.update(message);
        }
    }

    info!("Terminal viewer exiting");
    Ok(())
}

/// Translate a key press into a message for the current mode
fn map_key(model: &AppModel, key: KeyEvent) -> Option<Message> {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Some(Message::Quit);
    }

    if model.settings_panel.is_some() {
        return match key.code {
            KeyCode::Tab | KeyCode::Down => Some(Message::SettingsFocusNext),
            KeyCode::BackTab | KeyCode::Up => Some(Message::SettingsFocusPrev),
            KeyCode::Left => Some(Message::SettingsNudge(-1)),
            KeyCode::Right => Some(Message::SettingsNudge(1)),
            KeyCode::Char(' ') | KeyCode::Enter => Some(Message::SettingsActivate),
            KeyCode::Char('a') => Some(Message::SettingsApply),
            KeyCode::Esc => Some(Message::SettingsClose),
            _ => None,
        };
    }

    if model.device_picker.is_some() {
        return match key.code {
            KeyCode::Up => Some(Message::DevicePickerMove(-1)),
            KeyCode::Down => Some(Message::DevicePickerMove(1)),
            KeyCode::Enter => Some(Message::DevicePickerSelect),
            KeyCode::Esc | KeyCode::Char('d') => Some(Message::ToggleDevicePicker),
            _ => None,
        };
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => Some(Message::Quit),
        KeyCode::Char('r') => Some(Message::ToggleRecording),
        KeyCode::Char('s') => Some(Message::OpenSettings),
        KeyCode::Char('d') | KeyCode::Enter => Some(Message::ToggleDevicePicker),
        KeyCode::Char('p') => Some(Message::ToggleSession),
        KeyCode::Char('m') => Some(Message::ToggleMirrorPreview),
        KeyCode::Right => Some(Message::SwitchCamera),
        KeyCode::Left => Some(Message::SwitchCameraPrev),
        _ => None,
    }
}

fn build_status_message(model: &AppModel) -> String {
    let mut msg = String::new();

    if model.recording.is_recording() {
        let elapsed = model.recording.elapsed_duration();
        msg.push_str(&format!("● REC {:02}:{:02} | ", elapsed / 60, elapsed % 60));
    }

    match model.current_camera() {
        Some(device) => {
            msg.push_str(&device.name);
            if model.session_running {
                msg.push_str(&format!(" {:.0} fps", model.frame_stats.fps()));
            } else {
                msg.push_str(" (paused)");
            }
        }
        None => msg.push_str("No camera"),
    }

    if let Some(status) = &model.status_message {
        msg.push_str(" | ");
        msg.push_str(status);
    }

    msg.push_str(" | r record | s settings | d devices | ←/→ switch | p pause | m mirror | q quit");
    msg
}

/// Widget that renders a camera frame using half-block characters
struct FrameWidget<'a> {
    frame: Option<&'a CameraFrame>,
    mirror: bool,
}

impl Widget for &FrameWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let Some(frame) = self.frame.filter(|f| f.width > 0 && f.height > 0) else {
            let msg = "Waiting for camera...";
            let x = area.x + (area.width.saturating_sub(msg.len() as u16)) / 2;
            let y = area.y + area.height / 2;
            if y < area.y + area.height && x < area.x + area.width {
                buf.set_string(x, y, msg, Style::default());
            }
            return;
        };
        if area.width == 0 || area.height == 0 {
            return;
        }

        // Each terminal cell displays 2 vertical pixels
        let frame_aspect = frame.width as f64 / frame.height as f64;
        let term_width = area.width as f64;
        let term_height = (area.height as f64) * 2.0;

        let (display_width, display_height) = if term_width / term_height > frame_aspect {
            let h = term_height;
            ((h * frame_aspect) as u16, (h / 2.0) as u16)
        } else {
            let w = term_width;
            (w as u16, (w / frame_aspect / 2.0) as u16)
        };
        if display_width == 0 || display_height == 0 {
            return;
        }

        let x_offset = area.x + (area.width.saturating_sub(display_width)) / 2;
        let y_offset = area.y + (area.height.saturating_sub(display_height)) / 2;

        let x_scale = frame.width as f64 / display_width as f64;
        let y_scale = frame.height as f64 / (display_height as f64 * 2.0);

        for ty in 0..display_height {
            for tx in 0..display_width {
                let term_x = x_offset + tx;
                let term_y = y_offset + ty;

                let mut src_x = (tx as f64 * x_scale) as u32;
                if self.mirror {
                    src_x = frame.width.saturating_sub(1).saturating_sub(src_x);
                }
                let src_y_top = (ty as f64 * 2.0 * y_scale) as u32;
                let src_y_bottom = ((ty as f64 * 2.0 + 1.0) * y_scale) as u32;

                let (r, g, b) = frame.sample_rgb(src_x, src_y_top);
                let top = Color::Rgb(r, g, b);
                let (r, g, b) = frame.sample_rgb(src_x, src_y_bottom);
                let bottom = Color::Rgb(r, g, b);

                if let Some(cell) = buf.cell_mut((term_x, term_y)) {
                    cell.set_char('▀');
                    cell.set_fg(top);
                    cell.set_bg(bottom);
                }
            }
        }
    }
}

/// Status bar widget
struct StatusBar<'a> {
    message: &'a str,
    recording: bool,
}

impl Widget for StatusBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let bg = if self.recording {
            Color::Red
        } else {
            Color::DarkGray
        };

        for x in area.x..area.x + area.width {
            if let Some(cell) = buf.cell_mut((x, area.y)) {
                cell.set_char(' ');
                cell.set_bg(bg);
            }
        }

        let text: String = self.message.chars().take(area.width as usize).collect();
        buf.set_string(area.x, area.y, text, Style::default().fg(Color::White).bg(bg));
    }
}

/// Centered box of `width` x `height` inside `area`
fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

/// Device list overlay
struct DevicePicker<'a> {
    names: Vec<&'a str>,
    highlight: usize,
    current: Option<usize>,
}

impl Widget for DevicePicker<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let longest = self.names.iter().map(|n| n.chars().count()).max().unwrap_or(0);
        let width = (longest as u16).saturating_add(8).max(24);
        let popup = centered(area, width, self.names.len() as u16 + 2);
        Clear.render(popup, buf);

        let block = Block::default().borders(Borders::ALL).title(" Cameras ");
        let inner = block.inner(popup);
        block.render(popup, buf);

        for (i, name) in self.names.iter().enumerate() {
            let y = inner.y + i as u16;
            if y >= inner.y + inner.height {
                break;
            }
            let marker = if Some(i) == self.current { "●" } else { " " };
            let style = if i == self.highlight {
                Style::default().add_modifier(Modifier::REVERSED)
            } else {
                Style::default()
            };
            let line: String = format!("{} {}", marker, name)
                .chars()
                .take(inner.width as usize)
                .collect();
            buf.set_string(inner.x, y, line, style);
        }
    }
}

/// Exposure and white balance popup
struct SettingsPopup<'a> {
    panel: &'a SettingsPanel,
}

impl SettingsPopup<'_> {
    fn row_text(&self, field: SettingsField, slider_width: usize) -> String {
        let draft = self.panel.draft();
        match field {
            SettingsField::AutoExposure => checkbox(field.label(), draft.auto_exposure),
            SettingsField::AutoWhiteBalance => checkbox(field.label(), draft.auto_white_balance),
            SettingsField::Exposure => {
                let range = SettingsPanel::exposure_range();
                format!(
                    "{:<14}{} {:>4.0}%",
                    field.label(),
                    slider(draft.exposure_value, *range.start(), *range.end(), slider_width),
                    draft.exposure_value * 100.0
                )
            }
            SettingsField::WhiteBalance => {
                let range = SettingsPanel::white_balance_range();
                format!(
                    "{:<14}{} {:>5.0}K",
                    field.label(),
                    slider(draft.white_balance_value, *range.start(), *range.end(), slider_width),
                    draft.white_balance_value
                )
            }
            SettingsField::Apply | SettingsField::Close => format!("[ {} ]", field.label()),
        }
    }
}

impl Widget for SettingsPopup<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let popup = centered(area, 48, SettingsField::ALL.len() as u16 + 2);
        Clear.render(popup, buf);

        let title = if self.panel.is_modified() {
            " Camera settings * "
        } else {
            " Camera settings "
        };
        let block = Block::default().borders(Borders::ALL).title(title);
        let inner = block.inner(popup);
        block.render(popup, buf);

        let slider_width = (inner.width as usize).saturating_sub(22).max(4);
        for (i, field) in SettingsField::ALL.iter().enumerate() {
            let y = inner.y + i as u16;
            if y >= inner.y + inner.height {
                break;
            }
            let mut style = Style::default();
            if !self.panel.is_enabled(*field) {
                style = style.fg(Color::DarkGray);
            }
            if *field == self.panel.focus() {
                style = style.add_modifier(Modifier::REVERSED);
            }
            let line: String = self
                .row_text(*field, slider_width)
                .chars()
                .take(inner.width as usize)
                .collect();
            buf.set_string(inner.x, y, line, style);
        }
    }
}

fn checkbox(label: &str, checked: bool) -> String {
    format!("[{}] {}", if checked { "x" } else { " " }, label)
}

fn slider(value: f64, min: f64, max: f64, width: usize) -> String {
    let span = max - min;
    let fraction = if span > 0.0 {
        ((value - min) / span).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let filled = (fraction * width as f64).round() as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled.min(width)))
}
