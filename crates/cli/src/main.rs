use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use ab_glyph::FontVec;
use clap::{Parser, Subcommand};
use image::RgbImage;

use facelens_core::capture::domain::camera::{CameraError, CameraSource};
use facelens_core::capture::domain::photo::{encode_png, take_mirrored_photo};
use facelens_core::detection::face::DetectedFace;
use facelens_core::detection::wire::{parse_faces, DetectRequest, ErrorBody};
use facelens_core::render::overlay::{render_overlays, FaceAnnotation, OverlayStyle};
use facelens_core::session::{CaptureSession, SourceKind};

/// Detect faces through the facelens proxy and write an annotated image.
#[derive(Parser)]
#[command(name = "facelens")]
struct Cli {
    /// Base URL of the detection proxy.
    #[arg(long, default_value = "http://127.0.0.1:8787")]
    proxy: String,

    /// Where the annotated image is written.
    #[arg(long, default_value = "faces.png")]
    output: PathBuf,

    /// Integer canvas scale for sharper output on dense displays.
    #[arg(long, default_value = "1")]
    scale: u32,

    /// TTF font for the face labels; well-known system fonts are probed
    /// when omitted.
    #[arg(long)]
    font: Option<PathBuf>,

    #[command(subcommand)]
    source: Source,
}

#[derive(Subcommand)]
enum Source {
    /// Detect faces on a remote image URL.
    Url { url: String },

    /// Detect faces in a local image file.
    File { path: PathBuf },

    /// Capture one mirrored frame from the camera and detect faces on it.
    Camera {
        /// Video device path.
        #[arg(long, default_value = "/dev/video0")]
        device: String,
    },
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let mut session = CaptureSession::new();

    let (preview, request) = match acquire(&cli.source, &mut session) {
        Ok(acquired) => acquired,
        Err(e) => {
            session.fail(e.to_string());
            return Err(e);
        }
    };

    session.begin_detection();
    match submit(&cli.proxy, &request) {
        Ok(faces) => session.detection_succeeded(faces),
        Err(e) => {
            session.fail(e.to_string());
            return Err(e);
        }
    };

    let style = OverlayStyle {
        scale: cli.scale,
        font: load_font(cli.font.as_deref()),
        ..Default::default()
    };
    let (annotated, annotations) = render_overlays(&preview, session.faces(), &style);
    annotated.save(&cli.output)?;

    report(&annotations, &cli.output);
    Ok(())
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if cli.scale < 1 || cli.scale > 8 {
        return Err("--scale must be between 1 and 8".into());
    }
    if image::ImageFormat::from_path(&cli.output).is_err() {
        return Err(format!(
            "--output {} has no recognizable image extension",
            cli.output.display()
        )
        .into());
    }
    Ok(())
}

/// Obtain the preview image and the request that will represent it.
///
/// Leaves the session in the `Previewing` phase on success.
fn acquire(
    source: &Source,
    session: &mut CaptureSession,
) -> Result<(RgbImage, DetectRequest), Box<dyn std::error::Error>> {
    let acquired = match source {
        Source::Url { url } => {
            session.begin_acquire(SourceKind::RemoteUrl);
            // The URL itself is forwarded; the download is only for the
            // local preview the overlays are drawn on.
            let preview = fetch_preview(url)?;
            (preview, DetectRequest::for_url(url.clone()))
        }
        Source::File { path } => {
            session.begin_acquire(SourceKind::LocalFile);
            let bytes = fs::read(path)?;
            let preview = image::load_from_memory(&bytes)?.to_rgb8();
            let request = DetectRequest::for_image_bytes(&bytes, mime_for(path));
            (preview, request)
        }
        Source::Camera { device } => {
            session.begin_acquire(SourceKind::Camera);
            let mut camera = open_camera(device)?;
            camera.start()?;
            session.set_camera_active(true);
            // The capture step releases the device, success or not.
            let photo = take_mirrored_photo(camera.as_mut());
            session.set_camera_active(false);
            let photo = photo?;
            let png = encode_png(&photo)?;
            (photo, DetectRequest::for_image_bytes(&png, "image/png"))
        }
    };
    session.preview_ready();
    Ok(acquired)
}

fn fetch_preview(url: &str) -> Result<RgbImage, Box<dyn std::error::Error>> {
    let response = reqwest::blocking::get(url)?.error_for_status()?;
    let bytes = response.bytes()?;
    Ok(image::load_from_memory(&bytes)?.to_rgb8())
}

#[cfg(feature = "v4l2")]
fn open_camera(device: &str) -> Result<Box<dyn CameraSource>, CameraError> {
    use facelens_core::capture::infrastructure::v4l2_camera::V4l2Camera;
    Ok(Box::new(V4l2Camera::new(device)))
}

#[cfg(not(feature = "v4l2"))]
fn open_camera(_device: &str) -> Result<Box<dyn CameraSource>, CameraError> {
    Err(CameraError::Unsupported)
}

fn submit(
    proxy: &str,
    request: &DetectRequest,
) -> Result<Vec<DetectedFace>, Box<dyn std::error::Error>> {
    let response = reqwest::blocking::Client::new()
        .post(format!("{}/api/detect-faces", proxy.trim_end_matches('/')))
        .json(request)
        .send()?;
    let status = response.status();
    let body = response.text()?;

    if status.is_success() {
        return Ok(parse_faces(&body)?);
    }

    // The proxy sends a structured envelope; fall back to the raw text
    // for anything else that answers on that port.
    let message = match serde_json::from_str::<ErrorBody>(&body) {
        Ok(envelope) => match envelope.suggestion {
            Some(suggestion) => format!("{} ({suggestion})", envelope.error),
            None => envelope.error,
        },
        Err(_) => format!("proxy returned {status}: {body}"),
    };
    Err(message.into())
}

fn mime_for(path: &Path) -> &'static str {
    match image::ImageFormat::from_path(path) {
        Ok(image::ImageFormat::Png) => "image/png",
        Ok(image::ImageFormat::Gif) => "image/gif",
        Ok(image::ImageFormat::Bmp) => "image/bmp",
        _ => "image/jpeg",
    }
}

/// Probed in order when `--font` is not given.
const FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/Library/Fonts/Arial.ttf",
];

fn load_font(explicit: Option<&Path>) -> Option<FontVec> {
    let candidates: Vec<PathBuf> = match explicit {
        Some(path) => vec![path.to_path_buf()],
        None => FONT_CANDIDATES.iter().map(PathBuf::from).collect(),
    };
    for path in candidates {
        if let Ok(bytes) = fs::read(&path) {
            match FontVec::try_from_vec(bytes) {
                Ok(font) => {
                    log::debug!("label font: {}", path.display());
                    return Some(font);
                }
                Err(e) => log::warn!("unusable font {}: {e}", path.display()),
            }
        }
    }
    log::warn!("no label font found; labels will appear in the report only");
    None
}

fn report(annotations: &[FaceAnnotation], output: &Path) {
    if annotations.is_empty() {
        println!("No faces detected.");
    } else {
        for annotation in annotations {
            let rect = annotation.rectangle;
            println!(
                "{}: left={} top={} width={} height={}",
                annotation.label, rect.left, rect.top, rect.width, rect.height
            );
        }
    }
    println!("Annotated image written to {}", output.display());
}
