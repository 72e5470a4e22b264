pub mod invoice_line;
pub mod movement;
pub mod product;
pub mod supplier;
