mod models;
mod screens;
mod services;

use std::fs;
use std::path::Path;

use eframe::egui;
use screens::register::RegisterAction;
use services::config_loader::{self, FozlavaConfig};
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Clone, Copy, PartialEq, Eq)]
enum PortalScreen {
    Home,
    Results,
    Register,
    RegisteredList,
    Admin,
    Gallery,
}

impl PortalScreen {
    const ALL: [PortalScreen; 6] = [
        PortalScreen::Home,
        PortalScreen::Results,
        PortalScreen::Register,
        PortalScreen::RegisteredList,
        PortalScreen::Admin,
        PortalScreen::Gallery,
    ];

    fn label(self) -> &'static str {
        match self {
            PortalScreen::Home => "Points",
            PortalScreen::Results => "Results",
            PortalScreen::Register => "Register",
            PortalScreen::RegisteredList => "Registered List",
            PortalScreen::Admin => "Admin",
            PortalScreen::Gallery => "Gallery",
        }
    }

    /// Drop the screen's state, receivers and timers included, so
    /// nothing started here outlives the visit.
    fn reset(self) {
        match self {
            PortalScreen::Home => screens::home::reset(),
            PortalScreen::Results => screens::results::reset(),
            PortalScreen::Register => screens::register::reset(),
            PortalScreen::RegisteredList => screens::registered_list::reset(),
            PortalScreen::Admin => screens::admin::reset(),
            PortalScreen::Gallery => screens::gallery::reset(),
        }
    }
}

struct FozlavaApp {
    screen: PortalScreen,
    config: FozlavaConfig,
    config_error: Option<String>,
}

impl FozlavaApp {
    fn switch_to(&mut self, next: PortalScreen) {
        if next != self.screen {
            self.screen.reset();
            info!("Screen change: {} -> {}", self.screen.label(), next.label());
            self.screen = next;
        }
    }
}

impl eframe::App for FozlavaApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let mut requested: Option<PortalScreen> = None;

        egui::TopBottomPanel::top("portal_nav").show(ctx, |ui| {
            ui.add_space(4.0);
            ui.horizontal(|ui| {
                ui.label(egui::RichText::new("FOZLAVA").strong().size(20.0));
                ui.separator();
                for screen in PortalScreen::ALL {
                    if ui
                        .selectable_label(self.screen == screen, screen.label())
                        .clicked()
                    {
                        requested = Some(screen);
                    }
                }
            });
            if let Some(message) = &self.config_error {
                ui.colored_label(egui::Color32::LIGHT_RED, message);
            }
            ui.add_space(4.0);
        });

        if let Some(next) = requested {
            self.switch_to(next);
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.add_space(8.0);
            match self.screen {
                PortalScreen::Home => screens::home::ui(ui, &self.config),
                PortalScreen::Results => screens::results::ui(ui, &self.config),
                PortalScreen::Register => {
                    if let RegisterAction::ViewRegistrations { event } =
                        screens::register::ui(ui, &self.config)
                    {
                        screens::registered_list::set_initial_event(event);
                        self.switch_to(PortalScreen::RegisteredList);
                    }
                }
                PortalScreen::RegisteredList => screens::registered_list::ui(ui, &self.config),
                PortalScreen::Admin => screens::admin::ui(ui, &self.config),
                PortalScreen::Gallery => screens::gallery::ui(ui, &self.config),
            }
        });
    }
}

fn init_tracing() -> Option<WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(true);

    let _ = fs::create_dir_all("logs");
    let file_appender = tracing_appender::rolling::daily("logs", "fozlava.log");
    let (file_writer, file_guard) = tracing_appender::non_blocking(file_appender);
    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(file_writer)
        .with_target(true);

    let init_result = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();

    if let Err(err) = init_result {
        eprintln!("tracing init failed: {err}");
        return None;
    }

    Some(file_guard)
}

fn main() -> eframe::Result<()> {
    let _log_guard = init_tracing();
    info!("Starting FOZLAVA portal");

    let (config, config_error) =
        match config_loader::load_fozlava_config(Path::new("fozlava.toml")) {
            Ok(config) => (config, None),
            Err(message) => {
                error!("{message}");
                (FozlavaConfig::default(), Some(message))
            }
        };

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([1280.0, 800.0]),
        ..Default::default()
    };

    eframe::run_native(
        "FOZLAVA",
        options,
        Box::new(move |cc| {
            let mut style = (*cc.egui_ctx.style()).clone();
            style
                .text_styles
                .insert(egui::TextStyle::Heading, egui::FontId::proportional(28.0));
            style
                .text_styles
                .insert(egui::TextStyle::Body, egui::FontId::proportional(16.0));
            style
                .text_styles
                .insert(egui::TextStyle::Button, egui::FontId::proportional(16.0));
            style.spacing.button_padding = egui::vec2(12.0, 6.0);
            cc.egui_ctx.set_style(style);

            Ok(Box::new(FozlavaApp {
                screen: PortalScreen::Home,
                config,
                config_error,
            }))
        }),
    )
}
