/// Watched-root persistence port.
pub mod watched_roots;
