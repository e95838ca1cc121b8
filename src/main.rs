use eframe::egui::{Button, CollapsingHeader, Color32, ScrollArea, TextEdit};
use eframe::{Frame, egui};
use lectio::config::{AppConfig, Backend, CONFIG_FILE};
use lectio::extractor::{ExtractedSections, Section};
use lectio::llm::LLMBuilder;
use lectio::llm::dummy::DummyLLMBuilder;
use lectio::llm::openai::OpenAiChatBuilder;
use lectio::*;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::mpsc::{Receiver, Sender};
use std::thread;

fn main() {
    env_logger::init(); // Log to stderr (if you run with `RUST_LOG=debug`).

    let cfg = match AppConfig::load(Path::new(CONFIG_FILE)) {
        Ok(cfg) => cfg,
        Err(e) => {
            log::error!("Failed to load {CONFIG_FILE}: {e}, using defaults");
            AppConfig::default()
        }
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("tokio runtime");

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([1100.0, 720.0]),
        ..Default::default()
    };

    let (req_tx, req_rx) = std::sync::mpsc::channel();
    let (status_tx, status_rx) = std::sync::mpsc::channel();
    eframe::run_native(
        "Lectio",
        options,
        Box::new(move |cc| {
            let ctx = cc.egui_ctx.clone();
            let max_input_chars = cfg.max_input_chars;
            match cfg.backend {
                Backend::OpenAi => spawn_worker(
                    TranslationService::new(OpenAiChatBuilder::from_config(&cfg), max_input_chars),
                    runtime,
                    req_rx,
                    status_tx,
                    ctx,
                ),
                Backend::Dummy => spawn_worker(
                    TranslationService::new(DummyLLMBuilder::default(), max_input_chars),
                    runtime,
                    req_rx,
                    status_tx,
                    ctx,
                ),
            };
            Ok(Box::new(TranslationGui::new(cfg, req_tx, status_rx)))
        }),
    )
    .expect("eframe/egui run failed");
}

/// Serves requests one by one until the GUI side of the channel is gone.
fn spawn_worker<LB>(
    mut service: TranslationService<LB>,
    runtime: tokio::runtime::Runtime,
    requests: Receiver<TranslationRequest>,
    tx: Sender<TranslationStatus>,
    ctx: egui::Context,
) -> thread::JoinHandle<()>
where
    LB: LLMBuilder + Send + 'static,
    LB::Built: Send,
{
    thread::spawn(move || {
        for req in requests {
            let send_status = |status: TranslationStatus| {
                if tx.send(status).is_err() {
                    log::debug!("GUI is gone, dropping status");
                }
                ctx.request_repaint();
            };

            let translation_res = panic::catch_unwind(AssertUnwindSafe(|| {
                runtime.block_on(service.translate(&req, send_status))
            }));
            let status = match translation_res {
                Ok(Ok(sections)) => TranslationStatus::Success(sections),
                Ok(Err(failure)) => TranslationStatus::Error(failure),
                Err(_) => TranslationStatus::Error(TranslationError::OtherError(anyhow::anyhow!(
                    "Crash!"
                ))),
            };
            send_status(status);
        }
        log::debug!("Translation worker stopped");
    })
}

struct TranslationGui {
    cfg: AppConfig,
    api_key: String,
    latin_text: String,
    system_prompt: String,
    tx: Sender<TranslationRequest>,
    rx: Receiver<TranslationStatus>,
    status: Option<TranslationStatus>,
    sections: ExtractedSections,
    in_flight: bool,
    finished: bool,
}

impl TranslationGui {
    fn new(cfg: AppConfig, tx: Sender<TranslationRequest>, rx: Receiver<TranslationStatus>) -> Self {
        let system_prompt = prompt::load_system_prompt(&cfg.prompt_path);
        TranslationGui {
            cfg,
            api_key: "".to_owned(),
            latin_text: "".to_owned(),
            system_prompt,
            tx,
            rx,
            status: None,
            sections: ExtractedSections::default(),
            in_flight: false,
            finished: false,
        }
    }

    fn on_status(&mut self, status: TranslationStatus) {
        match &status {
            TranslationStatus::Started => {
                self.sections = ExtractedSections::default();
                self.finished = false;
            }
            TranslationStatus::Progress(progress) => {
                self.sections = progress.sections.clone();
            }
            TranslationStatus::Success(sections) => {
                self.sections = sections.clone();
                self.finished = true;
                self.in_flight = false;
            }
            TranslationStatus::Error(TranslationError::StreamError { partial, .. }) => {
                self.sections = partial.clone();
                self.in_flight = false;
            }
            TranslationStatus::Error(_) => {
                self.in_flight = false;
            }
        }
        self.status = Some(status);
    }

    fn submit(&mut self) {
        // Re-read so that prompt edits start a new session
        self.system_prompt = prompt::load_system_prompt(&self.cfg.prompt_path);

        let req = TranslationRequest {
            credential: self.api_key.clone(),
            system_prompt: self.system_prompt.clone(),
            text: self.latin_text.clone(),
        };
        self.status = None;
        match self.tx.send(req) {
            Ok(()) => self.in_flight = true,
            Err(_) => {
                self.status = Some(TranslationStatus::Error(TranslationError::OtherError(
                    anyhow::anyhow!("Translation worker is not running"),
                )))
            }
        }
    }

    fn status_line(&self) -> (String, Option<Color32>) {
        match self.status.as_ref() {
            Some(TranslationStatus::Started) => ("Starting translation...".to_owned(), None),
            Some(TranslationStatus::Progress(progress)) => {
                let mut text = format!(
                    "Translating... {} characters received",
                    progress.received_chars
                );
                if let Some(section) = progress.open_sections.first() {
                    text += &format!(", writing {}", section.title().to_lowercase());
                }
                (text, None)
            }
            Some(TranslationStatus::Success(_)) => ("Done!".to_owned(), Some(Color32::DARK_GREEN)),
            Some(TranslationStatus::Error(error)) => (format!("{}", error), Some(Color32::RED)),
            None => ("".to_owned(), None),
        }
    }
}

impl eframe::App for TranslationGui {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        while let Ok(status) = self.rx.try_recv() {
            self.on_status(status);
        }

        egui::SidePanel::left("configuration")
            .default_width(300.0)
            .show(ctx, |ui| {
                ui.heading("Configuration");

                let label = ui.label("API key");
                let text_edit = TextEdit::singleline(&mut self.api_key)
                    .password(true)
                    .desired_width(f32::INFINITY);
                ui.add(text_edit)
                    .labelled_by(label.id)
                    .on_hover_text("Required to use the translation service");
                ui.hyperlink_to("Get your API key", &self.cfg.api_key_url);

                ui.separator();

                CollapsingHeader::new("Show system prompt").show(ui, |ui| {
                    ScrollArea::vertical().max_height(480.0).show(ui, |ui| {
                        ui.monospace(&self.system_prompt);
                    });
                });
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("🏛 Latin to Italian translator");
            ui.label("Translate Latin texts into Italian with the help of a language model");

            if self.api_key.trim().is_empty() {
                ui.colored_label(
                    Color32::from_rgb(0xd0, 0x8c, 0x00),
                    "⚠ Enter your API key to start translating",
                );
            }

            ui.columns(2, |columns| {
                let max_chars = self.cfg.max_input_chars;

                columns[0].heading("Latin text");
                columns[0].add(
                    TextEdit::multiline(&mut self.latin_text)
                        .char_limit(max_chars)
                        .desired_rows(14)
                        .desired_width(f32::INFINITY)
                        .hint_text(format!("Latin text to translate (at most {max_chars} characters)")),
                );
                let remaining = max_chars.saturating_sub(self.latin_text.chars().count());
                columns[0].small(format!("Characters left: {remaining}"));

                columns[1].heading("Italian translation");
                ScrollArea::vertical()
                    .id_salt("translation")
                    .max_height(320.0)
                    .show(&mut columns[1], |ui| {
                        let translation = self.sections.get(Section::Translation);
                        if translation.is_empty() && self.in_flight {
                            ui.spinner();
                        } else {
                            ui.label(translation);
                        }
                    });
            });

            ui.horizontal(|ui| {
                let btn = ui
                    .add_enabled(!self.in_flight, Button::new("🔄 Translate"))
                    .on_hover_text("Send the Latin text to the model");

                let (status_text, status_text_color) = self.status_line();
                let mut status_text = status_text.as_str();
                ui.add(
                    TextEdit::singleline(&mut status_text)
                        .desired_width(f32::INFINITY)
                        .text_color_opt(status_text_color),
                );

                if btn.clicked() {
                    self.submit();
                }
            });

            if self.finished {
                ui.separator();
                ScrollArea::vertical().id_salt("sections").show(ui, |ui| {
                    for (section, content) in self.sections.iter().skip(1) {
                        CollapsingHeader::new(section.title())
                            .id_salt(section.tag())
                            .show(ui, |ui| {
                                if content.is_empty() {
                                    ui.weak("Nothing for this section");
                                } else {
                                    ui.label(content);
                                }
                            });
                    }
                });
            }
        });
    }
}
