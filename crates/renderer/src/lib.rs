//! Rendering of precipitation frames and the storm animation.

pub mod animation;
pub mod colormap;
pub mod config;
pub mod frame;
pub mod png;
pub mod text;

pub use animation::{render_animation, write_gif};
pub use colormap::{hex_to_rgb, ColorScale, ColorStop, Colormap};
pub use config::RenderConfig;
pub use frame::{colorbar_caption, frame_title, FrameRenderer, RenderedFrame};
pub use png::encode_png;
