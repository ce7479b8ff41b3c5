use std::collections::BTreeMap;
use std::sync::mpsc::{Receiver, TryRecvError};
use std::sync::{Mutex, OnceLock};

use chrono::Local;
use eframe::egui;

use crate::models::{RegistrationForm, RegistrationRecord, ScheduledEvent};
use crate::services::config_loader::FozlavaConfig;
use crate::services::portal_client::{
    FetchEvent, SubmitEvent, spawn_fetch_registrations, spawn_fetch_schedule,
    spawn_submit_registration,
};
use crate::services::registration;

const YEAR_OPTIONS: [&str; 5] = [
    "UG 1st Year",
    "UG 2nd Year",
    "UG 3rd Year",
    "PG 1st Year",
    "PG 2nd Year",
];

pub enum RegisterAction {
    Stay,
    ViewRegistrations { event: String },
}

#[derive(Default)]
struct RegisterUiState {
    fetches_started: bool,
    schedule_rx: Option<Receiver<FetchEvent<Vec<ScheduledEvent>>>>,
    schedule: Vec<ScheduledEvent>,
    schedule_error: Option<String>,
    registrations_rx: Option<Receiver<FetchEvent<Vec<RegistrationRecord>>>>,
    registrations: Vec<RegistrationRecord>,
    form: RegistrationForm,
    errors: BTreeMap<&'static str, String>,
    submit_rx: Option<Receiver<SubmitEvent>>,
    submitting: bool,
    submit_error: Option<String>,
    registration_number: Option<String>,
    was_duplicate: bool,
}

static REGISTER_STATE: OnceLock<Mutex<RegisterUiState>> = OnceLock::new();

fn register_state() -> &'static Mutex<RegisterUiState> {
    REGISTER_STATE.get_or_init(|| Mutex::new(RegisterUiState::default()))
}

pub fn reset() {
    let mut state = register_state().lock().expect("register state lock poisoned");
    *state = RegisterUiState::default();
}

pub fn ui(ui: &mut egui::Ui, config: &FozlavaConfig) -> RegisterAction {
    let mut guard = register_state().lock().expect("register state lock poisoned");
    let state = &mut *guard;
    let mut action = RegisterAction::Stay;

    // Schedule and registrations load independently; neither waits for
    // the other.
    if !state.fetches_started {
        state.fetches_started = true;
        state.schedule_rx = Some(spawn_fetch_schedule(config.endpoints.schedule.clone()));
        state.registrations_rx = Some(spawn_fetch_registrations(
            config.endpoints.registrations.clone(),
            None,
        ));
    }

    drain_schedule(state);
    drain_registrations(state);
    drain_submit(state, config);

    if state.schedule_rx.is_some() || state.registrations_rx.is_some() || state.submit_rx.is_some()
    {
        ui.ctx().request_repaint();
    }

    ui.vertical_centered(|ui| {
        ui.heading("Off-Stage Events");
    });
    ui.add_space(10.0);

    let today = Local::now().date_naive();
    let todays_events: Vec<ScheduledEvent> = state
        .schedule
        .iter()
        .filter(|event| event.is_on(today))
        .cloned()
        .collect();

    egui::ScrollArea::vertical()
        .id_salt("register_scroll")
        .auto_shrink([false, false])
        .show(ui, |ui| {
            ui.columns(2, |columns| {
                todays_events_panel(&mut columns[0], state, &todays_events);
                registration_form_panel(&mut columns[1], state, config, &todays_events, &mut action);
            });
        });

    action
}

fn todays_events_panel(
    ui: &mut egui::Ui,
    state: &mut RegisterUiState,
    todays_events: &[ScheduledEvent],
) {
    ui.label(egui::RichText::new("Today's Events").strong().size(18.0));
    ui.add_space(6.0);

    if let Some(message) = &state.schedule_error {
        ui.colored_label(egui::Color32::LIGHT_RED, message);
        if ui.button("Retry").clicked() {
            state.schedule_error = None;
            state.schedule_rx = None;
            state.fetches_started = false;
        }
        return;
    }

    if state.schedule_rx.is_some() {
        ui.horizontal(|ui| {
            ui.add(egui::Spinner::new());
            ui.label("Loading schedule...");
        });
        return;
    }

    if todays_events.is_empty() {
        ui.label("No events scheduled for today");
        return;
    }

    for event in todays_events {
        egui::Frame::group(ui.style()).show(ui, |ui| {
            ui.label(egui::RichText::new(&event.event).strong());
            ui.label(format!("Date: {}", event.formatted_date()));
            ui.label(format!("Time: {}", event.formatted_time()));
            if !event.venue.is_empty() {
                ui.label(format!("Venue: {}", event.venue));
            }
        });
        ui.add_space(6.0);
    }
}

fn registration_form_panel(
    ui: &mut egui::Ui,
    state: &mut RegisterUiState,
    config: &FozlavaConfig,
    todays_events: &[ScheduledEvent],
    action: &mut RegisterAction,
) {
    ui.label(egui::RichText::new("Registration Form").strong().size(18.0));
    ui.add_space(6.0);

    combo_field(ui, "Event", "register_event", &mut state.form.event, || {
        todays_events.iter().map(|e| e.event.clone()).collect()
    });
    field_error(ui, &state.errors, "event");

    ui.label("Name");
    ui.add_sized(
        [280.0, 26.0],
        egui::TextEdit::singleline(&mut state.form.name),
    );
    field_error(ui, &state.errors, "name");

    combo_field(
        ui,
        "Department",
        "register_department",
        &mut state.form.department,
        || config.all_departments(),
    );
    field_error(ui, &state.errors, "department");

    combo_field(ui, "Year", "register_year", &mut state.form.year, || {
        YEAR_OPTIONS.iter().map(|y| y.to_string()).collect()
    });
    field_error(ui, &state.errors, "year");

    ui.label("Roll number");
    ui.add_sized(
        [280.0, 26.0],
        egui::TextEdit::singleline(&mut state.form.roll_no),
    );
    field_error(ui, &state.errors, "rollNo");

    ui.label("Phone (10 digits)");
    ui.add_sized(
        [280.0, 26.0],
        egui::TextEdit::singleline(&mut state.form.phone),
    );
    field_error(ui, &state.errors, "phone");

    ui.label("Group (optional)");
    ui.add_sized(
        [280.0, 26.0],
        egui::TextEdit::singleline(&mut state.form.group),
    );

    ui.add_space(10.0);

    let can_submit = !state.submitting;
    if ui
        .add_enabled(can_submit, egui::Button::new("Register"))
        .clicked()
    {
        state.errors = registration::validate(&state.form);
        state.submit_error = None;
        if state.errors.is_empty() {
            state.registration_number = None;
            state.was_duplicate = false;
            state.submit_rx = Some(spawn_submit_registration(
                config.endpoints.registrations.clone(),
                state.form.clone(),
            ));
        }
    }

    if state.submitting {
        ui.horizontal(|ui| {
            ui.add(egui::Spinner::new());
            ui.label("Submitting...");
        });
    }

    if let Some(message) = &state.submit_error {
        ui.colored_label(
            egui::Color32::LIGHT_RED,
            format!("Submission failed: {message}"),
        );
    }

    if let Some(reg_num) = &state.registration_number {
        let note = if state.was_duplicate {
            format!("Already registered. Registration number: {reg_num}")
        } else {
            format!("Registered! Registration number: {reg_num}")
        };
        ui.colored_label(egui::Color32::LIGHT_GREEN, note);
    }

    ui.add_space(8.0);
    ui.horizontal(|ui| {
        if ui.button("View registrations").clicked() {
            *action = RegisterAction::ViewRegistrations {
                event: state.form.event.clone(),
            };
        }
        if !state.registrations.is_empty() {
            ui.colored_label(
                egui::Color32::GRAY,
                format!("{} registrations so far", state.registrations.len()),
            );
        }
    });
}

fn combo_field(
    ui: &mut egui::Ui,
    label: &str,
    id_salt: &str,
    value: &mut String,
    options: impl FnOnce() -> Vec<String>,
) {
    ui.label(label);
    egui::ComboBox::from_id_salt(id_salt)
        .width(280.0)
        .selected_text(if value.is_empty() {
            "-- Select --".to_string()
        } else {
            value.clone()
        })
        .show_ui(ui, |ui| {
            for option in options() {
                ui.selectable_value(value, option.clone(), option);
            }
        });
}

fn field_error(ui: &mut egui::Ui, errors: &BTreeMap<&'static str, String>, field: &str) {
    if let Some(message) = errors.get(field) {
        ui.colored_label(egui::Color32::LIGHT_RED, message);
    }
}

fn drain_schedule(state: &mut RegisterUiState) {
    loop {
        let event = {
            let Some(rx) = &state.schedule_rx else {
                break;
            };
            rx.try_recv()
        };
        match event {
            Ok(FetchEvent::Started) => {}
            Ok(FetchEvent::Finished(schedule)) => {
                state.schedule = schedule;
                state.schedule_error = None;
                state.schedule_rx = None;
                break;
            }
            Ok(FetchEvent::Failed { message }) => {
                state.schedule_error = Some(message);
                state.schedule_rx = None;
                break;
            }
            Err(TryRecvError::Empty) => break,
            Err(TryRecvError::Disconnected) => {
                state.schedule_rx = None;
                break;
            }
        }
    }
}

fn drain_registrations(state: &mut RegisterUiState) {
    loop {
        let event = {
            let Some(rx) = &state.registrations_rx else {
                break;
            };
            rx.try_recv()
        };
        match event {
            Ok(FetchEvent::Started) => {}
            Ok(FetchEvent::Finished(registrations)) => {
                state.registrations = registrations;
                state.registrations_rx = None;
                break;
            }
            Ok(FetchEvent::Failed { .. }) => {
                // The listing only feeds the count below the form; a
                // failure is already logged by the client.
                state.registrations_rx = None;
                break;
            }
            Err(TryRecvError::Empty) => break,
            Err(TryRecvError::Disconnected) => {
                state.registrations_rx = None;
                break;
            }
        }
    }
}

fn drain_submit(state: &mut RegisterUiState, config: &FozlavaConfig) {
    loop {
        let event = {
            let Some(rx) = &state.submit_rx else {
                break;
            };
            rx.try_recv()
        };
        match event {
            Ok(SubmitEvent::Started) => {
                state.submitting = true;
            }
            Ok(SubmitEvent::AlreadyRegistered { reg_num }) => {
                state.registration_number = Some(reg_num);
                state.was_duplicate = true;
                state.submitting = false;
                state.submit_rx = None;
                break;
            }
            Ok(SubmitEvent::Submitted { reg_num }) => {
                state.registration_number = Some(reg_num);
                state.was_duplicate = false;
                state.submitting = false;
                state.submit_rx = None;
                // Fresh submission: clear the form and refresh the
                // listing the duplicate guard reads.
                state.form = RegistrationForm::default();
                state.errors.clear();
                state.registrations_rx = Some(spawn_fetch_registrations(
                    config.endpoints.registrations.clone(),
                    None,
                ));
                break;
            }
            Ok(SubmitEvent::Failed { message }) => {
                // The form stays populated so the participant can just
                // resubmit.
                state.submit_error = Some(message);
                state.submitting = false;
                state.submit_rx = None;
                break;
            }
            Err(TryRecvError::Empty) => break,
            Err(TryRecvError::Disconnected) => {
                state.submitting = false;
                state.submit_rx = None;
                break;
            }
        }
    }
}
