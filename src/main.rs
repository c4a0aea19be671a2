use iced::widget::image::Handle;
use iced::widget::{
    button, checkbox, column, container, horizontal_rule, radio, row, scrollable, text,
    text_editor, text_input, Column, Image,
};
use iced::{event, time, window, Alignment, Element, Event, Font, Length, Subscription, Task, Theme};
use rfd::FileDialog;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod error;
mod media;
mod provider;
mod state;
mod ui;

use config::Settings;
use error::Error;
use media::loader::{self, Loaded};
use media::preview::{self, Preview, FRAME_H, FRAME_W};
use provider::{EditRequest, GrokClient, GrokModel};
use state::{ResultImage, Session, SourceOrigin};
use ui::style::{self, ACCENT_A, ACCENT_B, TEXT_DIM};
use ui::{ActivityLog, Status};

const INSTRUCTIONS: &str = "1. Load a source photo (file, drag & drop, or URL).\n\
2. Enter your xAI API key.\n\
3. Edit the prompt if desired, then click Generate.\n\
4. Use Save Output to keep the result.\n\n\
Your API key is used only to call api.x.ai directly - \
nothing is stored or transmitted elsewhere unless you tick \"Remember API key\".";

/// Main application state
struct MirrorMirror {
    /// Source, prompt, key and result for this run
    session: Session,
    settings: Settings,
    /// Where settings are written; `None` when the existing file could not be read
    settings_path: Option<PathBuf>,
    client: GrokClient,
    /// Editor backing the prompt; its text is mirrored into `session.prompt`
    prompt: text_editor::Content,
    url: String,
    source_preview: Option<Preview>,
    result_preview: Option<Preview>,
    activity: ActivityLog,
    /// Status message to display to the user
    status: Status,
}

/// Application messages (events)
#[derive(Debug, Clone)]
enum Message {
    /// User clicked "Browse File…"
    BrowseFile,
    /// A file was dropped on the window
    FileDropped(PathBuf),
    UrlChanged(String),
    /// User pressed "Load" or Enter in the URL field
    LoadUrl,
    /// Background load finished
    SourceLoaded(Result<Loaded, Arc<Error>>),
    PromptEdited(text_editor::Action),
    ApiKeyChanged(String),
    RememberKeyToggled(bool),
    ModelSelected(GrokModel),
    Generate,
    /// Provider call finished (result plus its preview)
    GenerationFinished(Result<(ResultImage, Preview), Arc<Error>>),
    SaveOutput,
    Saved(Result<PathBuf, Arc<Error>>),
    /// Activity log animation
    Tick,
}

impl MirrorMirror {
    /// Create a new instance of the application
    fn new() -> (Self, Task<Message>) {
        let (settings, settings_path, status) = startup_settings(Settings::path());

        // The app cannot do anything useful without an HTTP client
        let client = GrokClient::new(&settings.endpoint, settings.timeout())
            .expect("Failed to initialize HTTP client. Check TLS support on this system.");

        let session = Session::new(settings.model, settings.api_key.clone());
        let prompt = text_editor::Content::with_text(&session.prompt);

        tracing::info!(
            model = %session.model,
            endpoint = %settings.endpoint,
            "🪞 Mirror Mirror initialized"
        );

        (
            MirrorMirror {
                session,
                settings,
                settings_path,
                client,
                prompt,
                url: String::new(),
                source_preview: None,
                result_preview: None,
                activity: ActivityLog::default(),
                status,
            },
            Task::none(),
        )
    }

    /// Handle application messages and update state
    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::BrowseFile => {
                // Show the native file picker dialog
                let picked = FileDialog::new()
                    .set_title("Select source image")
                    .add_filter("Image files", &loader::SUPPORTED_EXTENSIONS[..])
                    .add_filter("All files", &["*"])
                    .pick_file();

                match picked {
                    Some(path) => self.load_source(
                        format!("Loading {}…", path.display()),
                        loader::load_from_path(path),
                    ),
                    None => Task::none(),
                }
            }
            // The loader sniffs the content, so any decodable file is accepted
            Message::FileDropped(path) => self.load_source(
                format!("Loading {}…", path.display()),
                loader::load_from_path(path),
            ),
            Message::UrlChanged(url) => {
                self.url = url;
                Task::none()
            }
            Message::LoadUrl => {
                let url = self.url.trim().to_string();
                if url.is_empty() {
                    self.status = Status::error("Please enter a URL.");
                    return Task::none();
                }
                self.load_source(
                    "Loading image from URL…".to_string(),
                    loader::load_from_url(self.client.http().clone(), url),
                )
            }
            Message::SourceLoaded(Ok(_)) if self.session.is_generating() => {
                // Finished loading after Generate was pressed; keep the photo being sent
                self.status = Status::error("Wait for the current generation to finish.");
                Task::none()
            }
            Message::SourceLoaded(Ok(loaded)) => {
                let where_from = match &loaded.image.origin {
                    SourceOrigin::File(_) => "file",
                    SourceOrigin::Url(_) => "URL",
                };
                self.status = Status::dim(format!(
                    "Source image loaded from {where_from} ({}×{}).",
                    loaded.preview.width, loaded.preview.height
                ));

                // A new source invalidates whatever was generated from the old one
                self.session.set_source(loaded.image);
                self.source_preview = Some(loaded.preview);
                self.result_preview = None;
                self.activity.hide();
                Task::none()
            }
            Message::SourceLoaded(Err(err)) => {
                tracing::warn!("could not load source: {err}");
                self.status = Status::error(format!("Could not load image: {err}"));
                Task::none()
            }
            Message::PromptEdited(action) => {
                self.prompt.perform(action);
                self.session.prompt = editor_text(&self.prompt);
                Task::none()
            }
            Message::ApiKeyChanged(key) => {
                self.session.api_key = key;
                Task::none()
            }
            Message::RememberKeyToggled(remember) => {
                self.settings.remember_key = remember;
                self.persist_settings();
                Task::none()
            }
            Message::ModelSelected(model) => {
                self.session.model = model;
                self.persist_settings();
                Task::none()
            }
            Message::Generate => {
                if self.session.is_generating() {
                    return Task::none();
                }

                let request = match self.session.begin_generation() {
                    Ok(request) => request,
                    Err(err) => {
                        self.status = Status::error(format!("Error: {err}"));
                        return Task::none();
                    }
                };

                self.result_preview = None;
                self.status = Status::dim("");
                self.activity.start(request.model.as_str(), &request.prompt);
                self.activity.push("Encoding source image to base64");
                self.activity.push(format!("Encoded  : {} KB", request.image.len() / 1024));
                self.activity.push(format!("Connecting to {}", self.client.host()));
                self.activity.push("Sending image + prompt to Grok");

                if self.settings.remember_key {
                    self.persist_settings();
                }

                Task::perform(
                    generate(self.client.clone(), request),
                    Message::GenerationFinished,
                )
            }
            Message::GenerationFinished(Ok((result, preview))) => {
                self.status = Status::success(completion_message(&result));
                self.activity.push("Response received");
                self.activity.push("Done");
                self.activity.hide();
                self.session.finish_generation(Ok(result));
                self.result_preview = Some(preview);
                Task::none()
            }
            Message::GenerationFinished(Err(err)) => {
                tracing::warn!("❌ generation failed: {err}");
                // Leave the log up so the failing step stays visible
                self.activity.push(format!("ERROR: {err}"));
                self.session.finish_generation(Err(&*err));
                self.result_preview = None;
                self.status = Status::error(if err.is_auth() {
                    format!("Authorization failed, check your xAI API key. ({err})")
                } else {
                    format!("Error: {err}")
                });
                Task::none()
            }
            Message::SaveOutput => {
                let result = match self.session.result_for_save() {
                    Ok(result) => result.clone(),
                    Err(err) => {
                        self.status = Status::error(err.to_string());
                        return Task::none();
                    }
                };

                let path = FileDialog::new()
                    .set_title("Save output image")
                    .set_file_name(media::export::default_file_name(
                        &result,
                        chrono::Local::now(),
                    ))
                    .add_filter("JPEG", &["jpg", "jpeg"])
                    .add_filter("PNG", &["png"])
                    .add_filter("WebP", &["webp"])
                    .save_file();

                match path {
                    Some(path) => {
                        self.status = Status::dim(format!("Saving to {}…", path.display()));
                        Task::perform(
                            async move {
                                media::export::save_result(result, path)
                                    .await
                                    .map_err(Arc::new)
                            },
                            Message::Saved,
                        )
                    }
                    None => Task::none(),
                }
            }
            Message::Saved(Ok(path)) => {
                self.status = Status::success(format!("Saved to {}", path.display()));
                Task::none()
            }
            Message::Saved(Err(err)) => {
                self.status = Status::error(format!("Save failed: {err}"));
                Task::none()
            }
            Message::Tick => {
                self.activity.tick();
                Task::none()
            }
        }
    }

    /// Start a background load unless a generation is in flight
    fn load_source(
        &mut self,
        status: String,
        load: impl Future<Output = error::Result<Loaded>> + Send + 'static,
    ) -> Task<Message> {
        if self.session.is_generating() {
            self.status = Status::error("Wait for the current generation to finish.");
            return Task::none();
        }

        self.status = Status::dim(status);
        Task::perform(
            async move { load.await.map_err(Arc::new) },
            Message::SourceLoaded,
        )
    }

    fn persist_settings(&mut self) {
        self.settings.model = self.session.model;
        self.settings.api_key = if self.settings.remember_key {
            Some(self.session.api_key.trim().to_string()).filter(|key| !key.is_empty())
        } else {
            None
        };

        let Some(path) = &self.settings_path else {
            tracing::debug!("settings not saved, the file on disk was unreadable at startup");
            return;
        };
        if let Err(err) = self.settings.save_to(path) {
            tracing::warn!("⚠️  could not save settings: {err}");
        }
    }

    /// Build the user interface
    fn view(&self) -> Element<Message> {
        let header = column![
            text("✦  Mirror Mirror  ✦").size(36).color(ACCENT_A),
            text("on the wall").size(15).color(TEXT_DIM),
            text(INSTRUCTIONS).size(13).color(TEXT_DIM),
        ]
        .spacing(6)
        .align_x(Alignment::Center);

        let busy = self.session.is_generating();

        let source_panel = column![
            label("SOURCE IMAGE"),
            frame(match &self.source_preview {
                Some(preview) => picture(preview),
                None => placeholder("Drop a photo here or\nenter a URL below"),
            }),
            text(source_caption(&self.session)).size(11).color(TEXT_DIM),
            row![
                text("URL:").size(13).color(TEXT_DIM),
                text_input("https://…", &self.url)
                    .on_input(Message::UrlChanged)
                    .on_submit(Message::LoadUrl)
                    .size(13),
                button(text("Load").size(13))
                    .on_press_maybe((!busy).then_some(Message::LoadUrl)),
            ]
            .spacing(6)
            .align_y(Alignment::Center),
            button(text("Browse File…  (or drag & drop above)").size(13))
                .on_press_maybe((!busy).then_some(Message::BrowseFile)),
        ]
        .spacing(8)
        .width(Length::Fixed(FRAME_W as f32));

        let output_view: Element<Message> = if self.activity.is_visible() {
            container(scrollable(
                text(self.activity.render()).font(Font::MONOSPACE).size(12),
            ))
            .padding(10)
            .width(Length::Fill)
            .height(Length::Fill)
            .style(style::log_panel)
            .into()
        } else if let Some(preview) = &self.result_preview {
            picture(preview)
        } else {
            placeholder("Your reflection\nawaits…")
        };

        let output_panel = column![
            label("TRANSFORMED IMAGE"),
            frame(output_view),
            button(text("Save Output…").size(13).color(ACCENT_B))
                .on_press_maybe(self.session.result().map(|_| Message::SaveOutput)),
        ]
        .spacing(8)
        .width(Length::Fixed(FRAME_W as f32));

        let panels = row![
            source_panel,
            text("→").size(28).color(style::BORDER),
            output_panel,
        ]
        .spacing(16)
        .align_y(Alignment::Center);

        let models = Column::with_children(GrokModel::ALL.iter().map(|&model| {
            radio(
                model.as_str(),
                model,
                Some(self.session.model),
                Message::ModelSelected,
            )
            .size(14)
            .text_size(13)
            .into()
        }))
        .spacing(4);

        let key_column = column![
            label("XAI API KEY"),
            text_input("xai-…", &self.session.api_key)
                .secure(true)
                .on_input(Message::ApiKeyChanged)
                .font(Font::MONOSPACE)
                .padding(8),
            checkbox("Remember API key", self.settings.remember_key)
                .on_toggle(Message::RememberKeyToggled)
                .size(14)
                .text_size(12),
        ]
        .spacing(6)
        .width(Length::Fill);

        let generate = button(text(if busy { "Generating…" } else { "Generate" }).size(16))
            .padding([10, 24])
            .on_press_maybe((!busy).then_some(Message::Generate));

        let controls = column![
            label("TRANSFORMATION PROMPT"),
            text_editor(&self.prompt)
                .on_action(Message::PromptEdited)
                .height(Length::Fixed(96.0))
                .padding(10),
            row![
                key_column,
                column![label("MODEL"), models].spacing(6),
                generate,
            ]
            .spacing(16)
            .align_y(Alignment::End),
        ]
        .spacing(8);

        let content = column![
            header,
            horizontal_rule(1),
            panels,
            controls,
            text(&self.status.text)
                .size(13)
                .color(self.status.tone.color()),
        ]
        .spacing(16)
        .padding(28)
        .align_x(Alignment::Center);

        container(scrollable(content))
            .width(Length::Fill)
            .height(Length::Fill)
            .center_x(Length::Fill)
            .into()
    }

    /// Window file drops always; the log ticker only while a request runs
    fn subscription(&self) -> Subscription<Message> {
        let drops = event::listen_with(|event, _status, _window| match event {
            Event::Window(window::Event::FileDropped(path)) => Some(Message::FileDropped(path)),
            _ => None,
        });

        if self.session.is_generating() {
            Subscription::batch([
                drops,
                time::every(Duration::from_millis(500)).map(|_| Message::Tick),
            ])
        } else {
            drops
        }
    }

    /// Set the application theme
    fn theme(&self) -> Theme {
        style::theme()
    }
}

/// Load settings from `path`. If the file is unreadable, fall back to
/// defaults and return no save path so the file is left for the user to fix.
fn startup_settings(path: Option<PathBuf>) -> (Settings, Option<PathBuf>, Status) {
    match Settings::load_at(path.as_deref()) {
        Ok(settings) => (settings, path, Status::default()),
        Err(err) => {
            tracing::warn!("⚠️  unreadable settings, using defaults and not saving: {err}");
            (
                Settings::default(),
                None,
                Status::error(format!("Could not read settings, using defaults: {err}")),
            )
        }
    }
}

fn label(title: &str) -> Element<'_, Message> {
    text(title).size(11).color(TEXT_DIM).into()
}

fn placeholder(hint: &str) -> Element<'_, Message> {
    text(hint).size(13).color(TEXT_DIM).center().into()
}

fn picture(preview: &Preview) -> Element<'_, Message> {
    Image::<Handle>::new(preview.handle.clone()).into()
}

fn frame(content: Element<'_, Message>) -> Element<'_, Message> {
    container(content)
        .center_x(Length::Fixed(FRAME_W as f32))
        .center_y(Length::Fixed(FRAME_H as f32))
        .style(style::image_frame)
        .into()
}

/// Where the current source came from, shown under its preview
fn source_caption(session: &Session) -> String {
    match session.source() {
        Some(source) => format!("{}  ·  {} KB", source.origin, source.len() / 1024),
        None => String::new(),
    }
}

fn completion_message(result: &ResultImage) -> String {
    format!(
        "Transformation complete with {} in {:.1}s. Use Save Output to keep the result.",
        result.model,
        result.elapsed.as_secs_f32()
    )
}

/// Text editor content without the trailing newline the editor always adds
fn editor_text(content: &text_editor::Content) -> String {
    let mut text = content.text();
    if text.ends_with('\n') {
        text.pop();
    }
    text
}

fn main() -> iced::Result {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mirror_mirror=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    iced::application("Mirror Mirror", MirrorMirror::update, MirrorMirror::view)
        .theme(MirrorMirror::theme)
        .subscription(MirrorMirror::subscription)
        .window_size((860.0, 920.0))
        .centered()
        .run_with(MirrorMirror::new)
}

/// Call the provider and build the result preview
/// Runs on the executor so the window stays responsive during the request
async fn generate(
    client: GrokClient,
    request: EditRequest,
) -> Result<(ResultImage, Preview), Arc<Error>> {
    async move {
        let result = client.edit(request).await?;
        let bytes = result.bytes.clone();
        let preview = tokio::task::spawn_blocking(move || preview::render(&bytes)).await??;
        Ok::<_, Error>((result, preview))
    }
    .await
    .map_err(Arc::new)
}
