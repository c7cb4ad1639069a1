pub mod blend;
pub mod caption;
pub mod compositor;
