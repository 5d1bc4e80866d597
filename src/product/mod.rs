mod image_product;
#[cfg(test)]
mod tests;

pub use image_product::ImageProduct;
