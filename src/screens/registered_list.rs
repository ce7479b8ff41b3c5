use std::sync::mpsc::{Receiver, TryRecvError};
use std::sync::{Mutex, OnceLock};

use eframe::egui;
use rfd::FileDialog;
use tracing::{error, info};

use crate::models::{RegistrationRecord, ScheduledEvent};
use crate::services::config_loader::FozlavaConfig;
use crate::services::portal_client::{
    FetchEvent, spawn_fetch_registrations, spawn_fetch_schedule,
};

#[derive(Default)]
struct RegisteredListUiState {
    events_started: bool,
    events_rx: Option<Receiver<FetchEvent<Vec<ScheduledEvent>>>>,
    event_names: Vec<String>,
    events_error: Option<String>,
    selected_event: String,
    pending_event: Option<String>,
    regs_rx: Option<Receiver<FetchEvent<Vec<RegistrationRecord>>>>,
    registrations: Vec<RegistrationRecord>,
    regs_error: Option<String>,
    search_query: String,
    export_note: Option<String>,
}

static REGISTERED_LIST_STATE: OnceLock<Mutex<RegisteredListUiState>> = OnceLock::new();

fn registered_list_state() -> &'static Mutex<RegisteredListUiState> {
    REGISTERED_LIST_STATE.get_or_init(|| Mutex::new(RegisteredListUiState::default()))
}

pub fn reset() {
    let mut state = registered_list_state()
        .lock()
        .expect("registered list state lock poisoned");
    *state = RegisteredListUiState::default();
}

/// Pre-select an event before navigating here (from the register
/// screen's "view registrations" button).
pub fn set_initial_event(event: String) {
    if event.is_empty() {
        return;
    }
    let mut state = registered_list_state()
        .lock()
        .expect("registered list state lock poisoned");
    state.pending_event = Some(event);
}

pub fn ui(ui: &mut egui::Ui, config: &FozlavaConfig) {
    let mut guard = registered_list_state()
        .lock()
        .expect("registered list state lock poisoned");
    let state = &mut *guard;

    if !state.events_started {
        state.events_started = true;
        state.events_rx = Some(spawn_fetch_schedule(config.endpoints.schedule.clone()));
    }

    if let Some(event) = state.pending_event.take() {
        select_event(state, config, event);
    }

    drain_events(state);
    drain_registrations(state);

    if state.events_rx.is_some() || state.regs_rx.is_some() {
        ui.ctx().request_repaint();
    }

    ui.vertical_centered(|ui| {
        ui.heading("Registered Participants");
    });
    ui.add_space(10.0);

    ui.horizontal(|ui| {
        ui.label("Event:");
        let mut chosen = state.selected_event.clone();
        egui::ComboBox::from_id_salt("registered_list_event")
            .width(260.0)
            .selected_text(if chosen.is_empty() {
                "Select Event".to_string()
            } else {
                chosen.clone()
            })
            .show_ui(ui, |ui| {
                for name in &state.event_names {
                    ui.selectable_value(&mut chosen, name.clone(), name);
                }
            });
        if chosen != state.selected_event {
            select_event(state, config, chosen);
        }

        ui.separator();
        ui.label("Search:");
        ui.add_sized(
            [220.0, 26.0],
            egui::TextEdit::singleline(&mut state.search_query)
                .hint_text("Name, department, reg no..."),
        );
    });

    if let Some(message) = &state.events_error {
        ui.add_space(6.0);
        ui.colored_label(egui::Color32::LIGHT_RED, message);
        if ui.button("Retry").clicked() {
            state.events_error = None;
            state.events_started = false;
        }
    }

    ui.add_space(10.0);

    if let Some(message) = &state.regs_error {
        ui.colored_label(egui::Color32::LIGHT_RED, message);
        if ui.button("Retry").clicked() {
            let event = state.selected_event.clone();
            select_event(state, config, event);
        }
        return;
    }

    if state.selected_event.is_empty() {
        ui.label("Pick an event to see its registrations.");
        return;
    }

    if state.regs_rx.is_some() {
        ui.horizontal(|ui| {
            ui.add(egui::Spinner::new());
            ui.label("Loading registrations...");
        });
        return;
    }

    let filtered = filter_registrations(&state.registrations, &state.search_query);

    ui.horizontal(|ui| {
        ui.label(format!(
            "{} of {} registrations",
            filtered.len(),
            state.registrations.len()
        ));
        if ui
            .add_enabled(!filtered.is_empty(), egui::Button::new("Export CSV..."))
            .clicked()
            && let Some(note) = export_csv(&state.selected_event, &filtered)
        {
            state.export_note = Some(note);
        }
        if let Some(note) = &state.export_note {
            ui.colored_label(egui::Color32::GRAY, note);
        }
    });
    ui.add_space(8.0);

    if filtered.is_empty() {
        ui.label("No registrations match.");
        return;
    }

    egui::ScrollArea::vertical()
        .id_salt("registered_list_scroll")
        .auto_shrink([false, false])
        .show(ui, |ui| {
            egui::Grid::new("registered_list_grid")
                .num_columns(5)
                .spacing([20.0, 6.0])
                .striped(true)
                .show(ui, |ui| {
                    for header in ["Reg No", "Name", "Department", "Roll No", "Group"] {
                        ui.label(egui::RichText::new(header).strong());
                    }
                    ui.end_row();

                    for record in &filtered {
                        ui.label(&record.reg_num);
                        ui.label(&record.name);
                        ui.label(&record.department);
                        ui.label(&record.roll_no);
                        ui.label(record.group.as_deref().unwrap_or("-"));
                        ui.end_row();
                    }
                });
        });
}

fn select_event(state: &mut RegisteredListUiState, config: &FozlavaConfig, event: String) {
    state.selected_event = event;
    state.registrations.clear();
    state.regs_error = None;
    state.export_note = None;
    state.regs_rx = if state.selected_event.is_empty() {
        None
    } else {
        Some(spawn_fetch_registrations(
            config.endpoints.registrations.clone(),
            Some(state.selected_event.clone()),
        ))
    };
}

fn filter_registrations<'a>(
    registrations: &'a [RegistrationRecord],
    query: &str,
) -> Vec<&'a RegistrationRecord> {
    let needle = query.to_lowercase();
    registrations
        .iter()
        .filter(|reg| {
            needle.is_empty()
                || reg.name.to_lowercase().contains(&needle)
                || reg.department.to_lowercase().contains(&needle)
                || reg.reg_num.to_lowercase().contains(&needle)
                || reg
                    .group
                    .as_deref()
                    .is_some_and(|group| group.to_lowercase().contains(&needle))
        })
        .collect()
}

/// Returns the status note to show, or None when the dialog was
/// cancelled.
fn export_csv(event: &str, rows: &[&RegistrationRecord]) -> Option<String> {
    let path = FileDialog::new()
        .set_file_name(format!("{event}.csv"))
        .save_file()?;

    let csv = registrations_csv(rows);
    match std::fs::write(&path, csv) {
        Ok(()) => {
            info!("Exported {} registrations to {}", rows.len(), path.display());
            Some(format!("Saved {}", path.display()))
        }
        Err(err) => {
            error!("CSV export failed: {err}");
            Some(format!("Export failed: {err}"))
        }
    }
}

fn registrations_csv(rows: &[&RegistrationRecord]) -> String {
    let mut out = String::from("Registration Number,Name,Department,Roll Number,Group\n");
    for reg in rows {
        let fields = [
            reg.reg_num.as_str(),
            reg.name.as_str(),
            reg.department.as_str(),
            reg.roll_no.as_str(),
            reg.group.as_deref().unwrap_or("-"),
        ];
        let line: Vec<String> = fields.iter().map(|field| csv_escape(field)).collect();
        out.push_str(&line.join(","));
        out.push('\n');
    }
    out
}

fn csv_escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn drain_events(state: &mut RegisteredListUiState) {
    loop {
        let event = {
            let Some(rx) = &state.events_rx else {
                break;
            };
            rx.try_recv()
        };
        match event {
            Ok(FetchEvent::Started) => {}
            Ok(FetchEvent::Finished(schedule)) => {
                let mut names: Vec<String> =
                    schedule.into_iter().map(|event| event.event).collect();
                let mut seen = std::collections::HashSet::new();
                names.retain(|name| !name.is_empty() && seen.insert(name.clone()));
                state.event_names = names;
                state.events_error = None;
                state.events_rx = None;
                break;
            }
            Ok(FetchEvent::Failed { message }) => {
                state.events_error = Some(message);
                state.events_rx = None;
                break;
            }
            Err(TryRecvError::Empty) => break,
            Err(TryRecvError::Disconnected) => {
                state.events_rx = None;
                break;
            }
        }
    }
}

fn drain_registrations(state: &mut RegisteredListUiState) {
    loop {
        let event = {
            let Some(rx) = &state.regs_rx else {
                break;
            };
            rx.try_recv()
        };
        match event {
            Ok(FetchEvent::Started) => {}
            Ok(FetchEvent::Finished(registrations)) => {
                state.registrations = registrations;
                state.regs_error = None;
                state.regs_rx = None;
                break;
            }
            Ok(FetchEvent::Failed { message }) => {
                state.regs_error = Some(message);
                state.regs_rx = None;
                break;
            }
            Err(TryRecvError::Empty) => break,
            Err(TryRecvError::Disconnected) => {
                state.regs_rx = None;
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(reg_num: &str, name: &str, department: &str, group: Option<&str>) -> RegistrationRecord {
        RegistrationRecord {
            event: "Dance".to_string(),
            name: name.to_string(),
            department: department.to_string(),
            year: None,
            roll_no: "7".to_string(),
            reg_num: reg_num.to_string(),
            group: group.map(ToString::to_string),
        }
    }

    #[test]
    fn search_covers_name_department_regnum_and_group() {
        let records = vec![
            record("REG-1", "Alice", "Physics", None),
            record("REG-2", "Bob", "Chemistry", Some("Team B")),
        ];

        assert_eq!(filter_registrations(&records, "alice").len(), 1);
        assert_eq!(filter_registrations(&records, "CHEM").len(), 1);
        assert_eq!(filter_registrations(&records, "reg-2").len(), 1);
        assert_eq!(filter_registrations(&records, "team b").len(), 1);
        assert_eq!(filter_registrations(&records, "").len(), 2);
        assert!(filter_registrations(&records, "zzz").is_empty());
    }

    #[test]
    fn csv_quotes_fields_that_need_it() {
        let tricky = record("REG-3", "D'Arcy, Jo", "Maths \"Pure\"", None);
        let rows = vec![&tricky];
        let csv = registrations_csv(&rows);
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "Registration Number,Name,Department,Roll Number,Group"
        );
        assert_eq!(
            lines.next().unwrap(),
            "REG-3,\"D'Arcy, Jo\",\"Maths \"\"Pure\"\"\",7,-"
        );
    }
}
