use std::time::Duration;

use anyhow::{Context, bail};
use clap::Parser;
use content_core::{ContentThread, CoreCommand, CoreConfig, UiNotification};
use document::{NodeContent, ReferenceDocument};
use model::{IntRect, NodeId};
use render_protocol::{ButtonOverlay, Color, KeyEvent, KeyModifiers, PixelCanvas};
use serde::Serialize;
use tiles::{DEFAULT_MAX_TILE_AREA, TileConfig};
use tracing_subscriber::EnvFilter;

/// Drives a reference document through the content thread and prints what got published.
#[derive(Parser, Debug)]
#[command(name = "content-demo")]
struct Args {
    #[arg(long, default_value_t = 800)]
    width: i32,

    #[arg(long, default_value_t = 600)]
    height: i32,

    /// Width used for the max-scroll derivation (defaults to the view width)
    #[arg(long)]
    screen_width: Option<i32>,

    /// Number of buttons laid out down the page
    #[arg(long, default_value_t = 4)]
    buttons: usize,

    /// Pointer samples pushed across the page
    #[arg(long, default_value_t = 32)]
    moves: usize,

    #[arg(long, default_value_t = DEFAULT_MAX_TILE_AREA)]
    max_tile_area: i64,

    #[arg(long, value_name = "MS", default_value_t = 100)]
    draw_budget_ms: u64,

    #[arg(long, default_value_t = 64)]
    command_capacity: usize,

    #[arg(long, value_name = "MS", default_value_t = 2000)]
    timeout_ms: u64,

    /// Print compact JSON
    #[arg(long, action = clap::ArgAction::SetTrue)]
    compact: bool,
}

impl Args {
    fn core_config(&self) -> CoreConfig {
        CoreConfig {
            tiles: TileConfig {
                max_tile_area: self.max_tile_area,
                draw_budget: Duration::from_millis(self.draw_budget_ms),
            },
            command_capacity: self.command_capacity,
            ..CoreConfig::default()
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Summary {
    content_rect: IntRect,
    tile_count: usize,
    publishes: usize,
    draw_requests: usize,
    split_after_slow_draw: bool,
    painted_pixels: u64,
    frame_cache_nodes: usize,
    cursor: Option<NodeId>,
    clicked: Vec<NodeId>,
    typed: Option<String>,
    button_overlays: Vec<ButtonOverlay>,
    last_generation: u64,
    dropped_pointer_samples: u64,
}

fn build_document(args: &Args) -> anyhow::Result<(ReferenceDocument, Vec<NodeId>, NodeId)> {
    let mut document = ReferenceDocument::new(args.width, args.height);
    let main = document.main_frame();
    document.add_node(
        main,
        IntRect::from_xywh(0, 0, args.width, 40),
        NodeContent::Block {
            color: Color::rgb(0x33, 0x66, 0x99),
        },
    )?;
    document.add_node(
        main,
        IntRect::from_xywh(10, 12, 200, 16),
        NodeContent::Text {
            text: "content-demo".to_owned(),
            color: Color::WHITE,
        },
    )?;
    let mut buttons = Vec::with_capacity(args.buttons);
    for index in 0..args.buttons {
        let y = 60 + 40 * i32::try_from(index).context("too many buttons")?;
        buttons.push(document.add_node(
            main,
            IntRect::from_xywh(20, y, 120, 24),
            NodeContent::Button {
                label: format!("button {index}"),
            },
        )?);
    }
    let input = document.add_node(
        main,
        IntRect::from_xywh(200, 60, 240, 24),
        NodeContent::TextInput {
            value: String::new(),
        },
    )?;
    document.set_focus(Some(input))?;
    Ok((document, buttons, input))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    let args = Args::parse();
    let timeout = Duration::from_millis(args.timeout_ms);

    let (document, buttons, input) = build_document(&args)?;
    let mut content = ContentThread::spawn(document, args.core_config())
        .context("failed to start the content thread")?;
    let mut publishes = 0usize;
    let mut draw_requests = 0usize;
    let mut tally = |notification: &UiNotification| {
        match notification {
            UiNotification::ContentDrawRequested => draw_requests += 1,
            UiNotification::ContentPublished(_) => publishes += 1,
        }
        matches!(notification, UiNotification::ContentPublished(_))
    };

    content.send(CoreCommand::SetSize {
        width: args.width,
        height: args.height,
        screen_width: args.screen_width.unwrap_or(args.width),
        scale: 1.0,
    })?;
    content.send(CoreCommand::DidFirstLayout)?;
    if content.wait_for_notification(timeout, &mut tally).is_none() {
        bail!("nothing was published within {timeout:?}");
    }

    for step in 0..args.moves {
        let step = i32::try_from(step).context("too many moves")?;
        content.move_pointer(None, None, 30 + step * 3, 60 + step * 5);
    }
    if let Some(first) = buttons.first() {
        content.touch_up(None, Some(*first), 30, 70)?;
    }
    for unichar in "hi".chars() {
        content.key(KeyEvent {
            key_code: 0,
            unichar: Some(unichar),
            down: true,
            modifiers: KeyModifiers::empty(),
        })?;
    }
    content.send(CoreCommand::ProgressFinished)?;
    content.send(CoreCommand::Invalidate(IntRect::from_size(args.width, args.height)))?;
    if content.wait_for_notification(timeout, &mut tally).is_none() {
        bail!("edits were not published within {timeout:?}");
    }

    let reader = content.reader().clone();
    let content_rect = reader.content_rect();
    let mut canvas = PixelCanvas::new(args.width.max(1), args.height.max(1));
    let split_after_slow_draw = reader.draw_into(&mut canvas, Color::BLACK);
    if split_after_slow_draw {
        tracing::info!("slow draw, splitting published content");
        content.send(CoreCommand::SplitContent)?;
    }

    let (reply, answer) = crossbeam_channel::bounded(1);
    content.edit_document(move |document: &mut ReferenceDocument| {
        let typed = match document.content(input) {
            Some(NodeContent::TextInput { value }) => Some(value.clone()),
            _ => None,
        };
        if reply.send((document.clicks().to_vec(), typed)).is_err() {
            tracing::warn!("demo stopped listening for the document state");
        }
    })?;
    let (clicked, typed) = answer
        .recv_timeout(timeout)
        .context("content thread did not answer")?;

    let frame_cache = reader.frame_cache();
    let summary = Summary {
        content_rect,
        tile_count: reader.tile_count(),
        publishes,
        draw_requests,
        split_after_slow_draw,
        painted_pixels: canvas.filled_pixels(),
        frame_cache_nodes: frame_cache.as_ref().map_or(0, |cache| cache.nav().len()),
        cursor: frame_cache.as_ref().and_then(|cache| cache.cursor()),
        clicked,
        typed,
        button_overlays: reader.button_overlays(),
        last_generation: reader.last_generation().raw(),
        dropped_pointer_samples: content.dropped_pointer_samples(),
    };
    content.shutdown();

    let json = if args.compact {
        serde_json::to_string(&summary)?
    } else {
        serde_json::to_string_pretty(&summary)?
    };
    println!("{json}");
    Ok(())
}
