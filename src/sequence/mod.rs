mod analyser;
#[cfg(test)]
mod tests;

pub use analyser::{
    is_image_file, list_images, load_image, write_csv, SequenceAnalyser, SequenceRow,
};
