//! Content thread and the UI-side handle that talks to it.
//!
//! Commands go over a bounded channel, pointer moves over a lossy ring where only the newest
//! sample matters, and notifications come back over a single-producer ring. Dropping the
//! handle shuts the thread down and joins it.

use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, select};
use engine::{
    CommandSender, CoreChannelError, Generation, GenerationKind, NotificationConsumer,
    PointerRingConsumer, PointerRingProducer, create_core_channels,
};
use model::{FrameId, IntRect, NodeId};
use render_protocol::{DocumentHost, KeyEvent, ListSelection};
use thiserror::Error;

use crate::{ContentCore, ContentReader, ContentUpdate, CoreConfig, CoreConfigError};

pub type DocumentEdit<H> = Box<dyn FnOnce(&mut H) + Send>;

pub enum CoreCommand<H> {
    Invalidate(IntRect),
    EditDocument(DocumentEdit<H>),
    TouchUp {
        generation: Generation,
        frame: Option<FrameId>,
        node: Option<NodeId>,
        x: i32,
        y: i32,
    },
    Key {
        generation: Generation,
        event: KeyEvent,
    },
    PopupReply(ListSelection),
    SetFindIsUp(bool),
    SetScrollOffset {
        x: i32,
        y: i32,
    },
    SetSize {
        width: i32,
        height: i32,
        screen_width: i32,
        scale: f32,
    },
    DidFirstLayout,
    ProgressFinished,
    SplitContent,
    Reset,
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerSample {
    pub generation: Generation,
    pub frame: Option<FrameId>,
    pub node: Option<NodeId>,
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiNotification {
    /// Something was invalidated; a publish will follow.
    ContentDrawRequested,
    ContentPublished(ContentUpdate),
}

#[derive(Debug, Error)]
pub enum ContentThreadError {
    #[error(transparent)]
    Config(#[from] CoreConfigError),
    #[error(transparent)]
    Channel(#[from] CoreChannelError),
    #[error("failed to spawn the content thread")]
    Spawn(#[source] std::io::Error),
}

impl<H: DocumentHost> ContentCore<H> {
    /// Returns false once the loop should stop.
    fn apply_command(&mut self, command: CoreCommand<H>) -> bool {
        match command {
            CoreCommand::Invalidate(rect) => self.invalidate(rect),
            CoreCommand::EditDocument(edit) => {
                edit(self.host_mut());
                self.content_changed();
            }
            CoreCommand::TouchUp {
                generation,
                frame,
                node,
                x,
                y,
            } => {
                self.touch_up(generation, frame, node, x, y);
            }
            CoreCommand::Key { generation, event } => {
                self.pass_key_to_document(generation, &event);
            }
            CoreCommand::PopupReply(selection) => {
                self.popup_reply(selection);
            }
            CoreCommand::SetFindIsUp(find_is_up) => self.set_find_is_up(find_is_up),
            CoreCommand::SetScrollOffset { x, y } => {
                self.set_scroll_offset(x, y);
            }
            CoreCommand::SetSize {
                width,
                height,
                screen_width,
                scale,
            } => {
                if let Err(error) = self.set_size(width, height, screen_width, scale) {
                    tracing::warn!(%error, width, height, "rejected view size");
                }
            }
            CoreCommand::DidFirstLayout => self.did_first_layout(),
            CoreCommand::ProgressFinished => self.notify_progress_finished(),
            CoreCommand::SplitContent => {
                self.split_content();
            }
            CoreCommand::Reset => self.reset(),
            CoreCommand::Shutdown => return false,
        }
        true
    }
}

fn run_content_loop<H: DocumentHost>(
    mut core: ContentCore<H>,
    commands: Receiver<CoreCommand<H>>,
    pointer_ring: PointerRingConsumer<PointerSample>,
) {
    tracing::debug!("content loop started");
    let pointer_wakeup = pointer_ring.wakeup().clone();
    loop {
        let keep_running = select! {
            recv(commands) -> command => match command {
                Ok(command) => core.apply_command(command) && drain_commands(&mut core, &commands),
                Err(_) => false,
            },
            recv(pointer_wakeup) -> _ => {
                if let Some(sample) = pointer_ring.take_latest() {
                    core.move_mouse_if_current(
                        sample.generation,
                        sample.frame,
                        sample.node,
                        sample.x,
                        sample.y,
                    );
                }
                true
            },
        };
        if !keep_running {
            break;
        }
        core.record_and_publish();
    }
    tracing::debug!(
        dropped_pointer_samples = pointer_ring.dropped_samples(),
        "content loop exiting"
    );
}

fn drain_commands<H: DocumentHost>(
    core: &mut ContentCore<H>,
    commands: &Receiver<CoreCommand<H>>,
) -> bool {
    while let Ok(command) = commands.try_recv() {
        if !core.apply_command(command) {
            return false;
        }
    }
    true
}

/// UI-side owner of the content thread.
pub struct ContentThread<H: DocumentHost + 'static> {
    commands: CommandSender<CoreCommand<H>>,
    pointer_ring: PointerRingProducer<PointerSample>,
    notifications: NotificationConsumer<UiNotification>,
    reader: ContentReader,
    handle: Option<JoinHandle<()>>,
}

impl<H: DocumentHost + 'static> ContentThread<H> {
    pub fn spawn(host: H, config: CoreConfig) -> Result<Self, ContentThreadError> {
        let mut core = ContentCore::new(host, config)?;
        let (ui_channels, content_channels) =
            create_core_channels::<CoreCommand<H>, UiNotification, PointerSample>(
                config.command_capacity,
                config.pointer_ring_capacity,
                config.notification_capacity,
            );
        core.set_notifications(content_channels.notifications);
        let reader = core.reader();
        let commands = content_channels.commands;
        let pointer_ring = content_channels.pointer_ring;
        let handle = std::thread::Builder::new()
            .name("content".to_owned())
            .spawn(move || run_content_loop(core, commands, pointer_ring))
            .map_err(ContentThreadError::Spawn)?;
        Ok(Self {
            commands: ui_channels.commands,
            pointer_ring: ui_channels.pointer_ring,
            notifications: ui_channels.notifications,
            reader,
            handle: Some(handle),
        })
    }

    pub fn reader(&self) -> &ContentReader {
        &self.reader
    }

    pub fn send(&self, command: CoreCommand<H>) -> Result<(), CoreChannelError> {
        self.commands.send(command)
    }

    pub fn edit_document(
        &self,
        edit: impl FnOnce(&mut H) + Send + 'static,
    ) -> Result<(), CoreChannelError> {
        self.send(CoreCommand::EditDocument(Box::new(edit)))
    }

    /// Queues a mouse move stamped with a fresh move generation.
    pub fn move_pointer(
        &self,
        frame: Option<FrameId>,
        node: Option<NodeId>,
        x: i32,
        y: i32,
    ) -> Generation {
        let generation = self.reader.next_generation(GenerationKind::Move);
        self.pointer_ring.push(PointerSample {
            generation,
            frame,
            node,
            x,
            y,
        });
        generation
    }

    pub fn touch_up(
        &self,
        frame: Option<FrameId>,
        node: Option<NodeId>,
        x: i32,
        y: i32,
    ) -> Result<Generation, CoreChannelError> {
        let generation = self.reader.next_generation(GenerationKind::Touch);
        self.send(CoreCommand::TouchUp {
            generation,
            frame,
            node,
            x,
            y,
        })?;
        Ok(generation)
    }

    pub fn key(&self, event: KeyEvent) -> Result<Generation, CoreChannelError> {
        let generation = self.reader.next_generation(GenerationKind::Text);
        self.send(CoreCommand::Key { generation, event })?;
        Ok(generation)
    }

    pub fn dropped_pointer_samples(&self) -> u64 {
        self.pointer_ring.dropped_samples()
    }

    pub fn poll_notifications(&mut self) -> Vec<UiNotification> {
        self.notifications.drain()
    }

    /// Polls until a notification matches `accept` or `timeout` passes. Notifications that
    /// do not match are discarded.
    pub fn wait_for_notification(
        &mut self,
        timeout: Duration,
        mut accept: impl FnMut(&UiNotification) -> bool,
    ) -> Option<UiNotification> {
        let deadline = Instant::now() + timeout;
        loop {
            while let Some(notification) = self.notifications.pop() {
                if accept(&notification) {
                    return Some(notification);
                }
            }
            if Instant::now() >= deadline || self.notifications.is_abandoned() {
                return None;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    /// Stops the loop and joins the thread.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        if self.commands.send(CoreCommand::Shutdown).is_err() {
            tracing::debug!("content thread already gone");
        }
        if handle.join().is_err() {
            tracing::error!("content thread panicked");
        }
    }
}

impl<H: DocumentHost + 'static> Drop for ContentThread<H> {
    fn drop(&mut self) {
        self.stop();
    }
}
