pub mod car_animation;
pub mod car_annotation;
pub mod map_surface;

pub use car_animation::CarAnimator;
pub use car_annotation::CarAnnotation;
pub use map_surface::{MapSnapshot, MapState, MapSurface, Overlay, Region};
