use std::io::{self, BufRead};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use crossbeam_channel::{Receiver, Sender};
use engine::{
    CanvasMetrics, FrameStatus, Liveness, RenderTarget, RunnerOptions, ShaderRunner,
    SubmitOutcome,
};
use shadergen::{GeneratedShader, GenerationClient, GenerationError, Role, ShaderGenerator};
use studio::{
    Conversation, OutgoingRequest, RequestPurpose, SelfHealCoordinator, ShaderDraft, StudioState,
};
use tracing::{debug, error, info, warn};
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Event, KeyEvent, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoopBuilder, EventLoopProxy, EventLoopWindowTarget};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowBuilder};

use crate::bindings::payload_from_draft;
use crate::bootstrap::Settings;
use crate::input::{parse_input, InputCommand, HELP};
use crate::status::{error_notice, window_title};

const WINDOW_TITLE: &str = "PromptGPU";

/// Everything the event loop reacts to besides window events.
#[derive(Debug)]
pub enum HostEvent {
    Input(InputCommand),
    InputClosed,
    Generated {
        purpose: RequestPurpose,
        result: Result<GeneratedShader, GenerationError>,
    },
}

pub fn run_studio(settings: Settings) -> Result<()> {
    let client = GenerationClient::new(&settings.endpoint, settings.timeout)
        .context("failed to construct generation client")?;
    info!(endpoint = %client.endpoint(), model = %settings.model, "using generation service");

    let event_loop = EventLoopBuilder::<HostEvent>::with_user_event()
        .build()
        .map_err(|err| anyhow!("failed to create event loop: {err}"))?;
    let window = WindowBuilder::new()
        .with_title(WINDOW_TITLE)
        .with_inner_size(PhysicalSize::new(settings.width, settings.height))
        .build(&event_loop)
        .map_err(|err| anyhow!("failed to create window: {err}"))?;
    let window = Arc::new(window);

    let (error_tx, error_rx) = crossbeam_channel::unbounded();
    let metrics = CanvasMetrics::from_physical(window.inner_size(), window.scale_factor());
    let options = RunnerOptions {
        start_playing: !settings.start_paused,
        ..RunnerOptions::default()
    };
    let runner = pollster::block_on(ShaderRunner::create(
        RenderTarget::Window(window.clone()),
        metrics,
        options,
        error_tx,
        Liveness::new(),
    ))
    .context("failed to start the shader engine")?;

    let requests = spawn_generation_worker(client, event_loop.create_proxy());
    spawn_stdin_reader(event_loop.create_proxy());

    let mut studio = Studio::new(&settings, window, runner, error_rx, requests);
    studio.start();

    event_loop
        .run(move |event, elwt| match event {
            Event::UserEvent(event) => studio.handle_host_event(event, elwt),
            Event::WindowEvent { window_id, event } if window_id == studio.window.id() => {
                studio.handle_window_event(event, elwt)
            }
            Event::AboutToWait => studio.schedule(elwt),
            Event::LoopExiting => studio.shutdown(),
            _ => {}
        })
        .map_err(|err| anyhow!("window event loop error: {err}"))
}

struct Studio {
    window: Arc<Window>,
    runner: ShaderRunner,
    conversation: Conversation,
    initial: ShaderDraft,
    errors: Receiver<String>,
    requests: Sender<OutgoingRequest>,
    last_printed: u64,
    rendering: String,
    shown_error: Option<String>,
}

impl Studio {
    fn new(
        settings: &Settings,
        window: Arc<Window>,
        runner: ShaderRunner,
        errors: Receiver<String>,
        requests: Sender<OutgoingRequest>,
    ) -> Self {
        let state = StudioState::new(settings.model, !settings.start_paused);
        let conversation = Conversation::new(state, SelfHealCoordinator::new(settings.heal_attempts))
            .with_history_limit(settings.history);
        let initial = ShaderDraft {
            fragment: Arc::from(settings.initial_fragment.as_str()),
            compute: None,
            description: settings.initial_description.clone(),
        };
        Self {
            window,
            runner,
            conversation,
            initial,
            errors,
            requests,
            last_printed: 0,
            rendering: String::new(),
            shown_error: None,
        }
    }

    fn start(&mut self) {
        println!("{HELP}");
        self.show_initial();
    }

    fn show_initial(&mut self) {
        let draft = self.initial.clone();
        self.conversation.state_mut().set_current_shader(draft.clone());
        self.apply(draft);
    }

    fn handle_host_event(&mut self, event: HostEvent, elwt: &EventLoopWindowTarget<HostEvent>) {
        match event {
            HostEvent::Input(command) => self.handle_command(command, elwt),
            HostEvent::InputClosed => debug!("stdin closed; prompts disabled"),
            HostEvent::Generated { purpose, result } => {
                if let Some(draft) = self.conversation.on_generation_result(purpose, result) {
                    self.apply(draft);
                } else {
                    self.flush_transcript();
                }
            }
        }
        self.refresh_status();
    }

    fn handle_command(&mut self, command: InputCommand, elwt: &EventLoopWindowTarget<HostEvent>) {
        match command {
            InputCommand::Prompt(prompt) => match self.conversation.submit_prompt(&prompt) {
                Some(request) => {
                    self.flush_transcript();
                    self.dispatch(request);
                }
                None => println!("still generating; wait for the current shader"),
            },
            InputCommand::Play => self.set_playing(true),
            InputCommand::Pause => self.set_playing(false),
            InputCommand::Reset => {
                self.conversation.reset();
                self.last_printed = 0;
                println!("conversation cleared");
                self.show_initial();
            }
            InputCommand::Model(model) => {
                self.conversation.state_mut().set_model(model);
                println!("model: {model}");
            }
            InputCommand::Dismiss => self.conversation.state_mut().dismiss_error(),
            InputCommand::ShowError => match self.conversation.state().error() {
                Some(error) => println!("{error}"),
                None => println!("no error"),
            },
            InputCommand::Help => println!("{HELP}"),
            InputCommand::Quit => elwt.exit(),
            InputCommand::Empty => {}
            InputCommand::Unknown(raw) => println!("unknown command {raw}; type :help"),
        }
    }

    fn handle_window_event(&mut self, event: WindowEvent, elwt: &EventLoopWindowTarget<HostEvent>) {
        match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => elwt.exit(),
            WindowEvent::KeyboardInput { event, .. } => self.handle_key(&event, elwt),
            WindowEvent::RedrawRequested => match self.runner.render_frame(Instant::now()) {
                FrameStatus::Reconfigured => self.window.request_redraw(),
                FrameStatus::Halted if !self.runner.is_destroyed() => {
                    debug!("frame loop halted");
                }
                _ => {}
            },
            other => {
                self.runner.handle_window_event(&other);
            }
        }
    }

    fn handle_key(&mut self, event: &KeyEvent, elwt: &EventLoopWindowTarget<HostEvent>) {
        if event.state != ElementState::Pressed || event.repeat {
            return;
        }
        match event.logical_key {
            Key::Named(NamedKey::Space) => {
                let playing = self.conversation.state_mut().toggle_play();
                self.runner.set_playing(playing);
                println!("{}", if playing { "playing" } else { "paused" });
            }
            Key::Named(NamedKey::Escape) => elwt.exit(),
            _ => {}
        }
    }

    fn schedule(&mut self, elwt: &EventLoopWindowTarget<HostEvent>) {
        self.drain_errors();
        let now = Instant::now();
        if !self.runner.frame_loop_armed() {
            elwt.set_control_flow(ControlFlow::Wait);
        } else if let Some(deadline) = self.runner.idle_wakeup(now) {
            elwt.set_control_flow(ControlFlow::WaitUntil(deadline));
        } else {
            self.window.request_redraw();
            elwt.set_control_flow(ControlFlow::Wait);
        }
    }

    fn set_playing(&mut self, playing: bool) {
        self.conversation.state_mut().set_playing(playing);
        self.runner.set_playing(playing);
        self.window.request_redraw();
    }

    /// Submits a draft to the engine, reports the verdict back to the
    /// conversation, and sends a corrective request if one is due.
    fn apply(&mut self, draft: ShaderDraft) {
        let payload = payload_from_draft(&draft);
        match pollster::block_on(self.runner.submit(&payload)) {
            SubmitOutcome::Applied { generation } => {
                debug!(generation, "draft applied");
                self.conversation.on_compile_result(&draft.fragment, Ok(()));
                self.rendering = draft.description.clone();
            }
            SubmitOutcome::Rejected { message } => {
                self.conversation
                    .on_compile_result(&draft.fragment, Err(&message));
            }
            SubmitOutcome::Detached => debug!("engine detached; draft dropped"),
        }
        self.drain_errors();
        if let Some(request) = self.conversation.next_fix_request() {
            self.dispatch(request);
        }
        self.flush_transcript();
        self.refresh_status();
        self.window.request_redraw();
    }

    /// Keeps the standing error visible in the title and announces changes to it.
    fn refresh_status(&mut self) {
        let current = self.conversation.state().error();
        if let Some(notice) = error_notice(self.shown_error.as_deref(), current) {
            println!("{notice}");
            self.shown_error = current.map(str::to_string);
        }
        self.window
            .set_title(&window_title(WINDOW_TITLE, &self.rendering, current));
    }

    fn dispatch(&mut self, request: OutgoingRequest) {
        if self.requests.send(request).is_err() {
            error!("generation worker stopped; request dropped");
            self.conversation.state_mut().set_generating(false);
        }
    }

    fn drain_errors(&mut self) {
        for message in self.errors.try_iter() {
            eprintln!("shader error:\n{message}");
        }
    }

    fn flush_transcript(&mut self) {
        for message in self.conversation.state().messages() {
            if message.id <= self.last_printed {
                continue;
            }
            let speaker = match message.role {
                Role::User => "you",
                Role::Assistant => "studio",
            };
            println!("{speaker}> {}", message.content);
            self.last_printed = message.id;
        }
    }

    fn shutdown(&mut self) {
        self.runner.destroy();
        info!("studio closed");
    }
}

/// Runs generation round-trips off the event loop; exits when the sender drops.
fn spawn_generation_worker<G>(generator: G, proxy: EventLoopProxy<HostEvent>) -> Sender<OutgoingRequest>
where
    G: ShaderGenerator + Send + 'static,
{
    let (tx, rx) = crossbeam_channel::unbounded::<OutgoingRequest>();
    thread::spawn(move || {
        for OutgoingRequest { purpose, request } in rx {
            debug!(?purpose, model = %request.model(), "sending generation request");
            let result = generator.generate(&request);
            if proxy
                .send_event(HostEvent::Generated { purpose, result })
                .is_err()
            {
                break;
            }
        }
        debug!("generation worker exiting");
    });
    tx
}

fn spawn_stdin_reader(proxy: EventLoopProxy<HostEvent>) {
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(err) => {
                    warn!(error = %err, "failed to read stdin");
                    break;
                }
            };
            if proxy
                .send_event(HostEvent::Input(parse_input(&line)))
                .is_err()
            {
                return;
            }
        }
        let _ = proxy.send_event(HostEvent::InputClosed);
    });
}
