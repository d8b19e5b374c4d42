use std::rc::Rc;

use anyhow::Context;
use image::RgbaImage;
use snapframe::capture::StaticCaptureStrategy;
use snapframe::config::ShapeColor;
use snapframe::domain::{
    AnnotationKind, ArrowAnnotation, PixelateAnnotation, Point, Rect, ScreenDescriptor,
    ShapeAnnotation, Size, TextAnnotation, Tool,
};
use snapframe::events::{
    AnnotationCreated, ExportRequested, SelectionChanged, SelectionFinished, SelectionStarted,
    ToolChanged,
};
use snapframe::export::PngExporter;
use snapframe::{EngineConfig, OverlayOrchestrator};

/// Stand-in for a platform capture: a diagonal gradient per screen
fn synthetic_strategy(screens: &[ScreenDescriptor]) -> StaticCaptureStrategy {
    screens.iter().fold(StaticCaptureStrategy::new(), |strategy, screen| {
        let (w, h) = screen.physical_size();
        let image = RgbaImage::from_fn(w, h, |x, y| {
            image::Rgba([
                (x * 255 / w.max(1)) as u8,
                (y * 255 / h.max(1)) as u8,
                160,
                255,
            ])
        });
        strategy.with_screen(screen.name.clone(), image)
    })
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let config = EngineConfig::load();
    let screens = vec![
        ScreenDescriptor::new("DP-1", Rect::new(0.0, 0.0, 1920.0, 1080.0), 1.0),
        ScreenDescriptor::new("eDP-1", Rect::new(1920.0, 0.0, 3200.0, 800.0), 2.0),
    ];
    let strategy = Rc::new(synthetic_strategy(&screens));
    let exporter = Rc::new(PngExporter::new(std::env::temp_dir()));
    let shape_color = config.shape_color;
    let shadow = config.shape_shadow;
    let block_size = config.pixelation_block_size;
    let text_size = config.text_size;

    let orchestrator = OverlayOrchestrator::new(config, strategy, exporter.clone());
    orchestrator.open(screens);

    let window = orchestrator
        .window("eDP-1")
        .context("no overlay window for eDP-1")?;
    let bus = window.bus();

    let selection = Rect::new(100.0, 100.0, 500.0, 350.0);
    bus.publish(&SelectionStarted {
        origin: selection.top_left(),
    });
    bus.publish(&SelectionChanged { rect: selection });
    bus.publish(&SelectionFinished { rect: selection });

    bus.publish(&ToolChanged { tool: Tool::Arrow });
    bus.publish(&AnnotationCreated {
        kind: AnnotationKind::Arrow(ArrowAnnotation {
            start: Point::new(140.0, 300.0),
            end: Point::new(380.0, 160.0),
            color: shape_color,
            shadow,
        }),
    });
    bus.publish(&ToolChanged {
        tool: Tool::Rectangle,
    });
    bus.publish(&AnnotationCreated {
        kind: AnnotationKind::Rectangle(ShapeAnnotation {
            start: Point::new(360.0, 130.0),
            end: Point::new(470.0, 200.0),
            color: shape_color,
            shadow,
        }),
    });
    bus.publish(&ToolChanged {
        tool: Tool::Pixelate,
    });
    bus.publish(&AnnotationCreated {
        kind: AnnotationKind::Pixelate(PixelateAnnotation {
            start: Point::new(120.0, 260.0),
            end: Point::new(260.0, 340.0),
            block_size,
        }),
    });

    bus.publish(&ToolChanged { tool: Tool::Text });
    bus.publish(&AnnotationCreated {
        kind: AnnotationKind::Text(TextAnnotation {
            origin: Point::new(300.0, 280.0),
            text: "snapframe".to_string(),
            font_size: text_size,
            color: ShapeColor::BLACK,
            background: Some(ShapeColor {
                r: 1.0,
                g: 0.9,
                b: 0.3,
            }),
        }),
    });

    if let Some(toolbar) = orchestrator.toolbar_placement("eDP-1", Size::new(320.0, 44.0)) {
        log::info!(
            "Toolbar {:?} at ({}, {})",
            toolbar.anchor,
            toolbar.position.x,
            toolbar.position.y
        );
    }

    bus.publish(&ExportRequested);
    let delivered = orchestrator.run_pending_actions().await;
    orchestrator.teardown();

    if delivered == 0 {
        anyhow::bail!("export did not complete, see log for details");
    }
    for path in exporter.saved() {
        println!("{}", path.display());
    }
    Ok(())
}
