pub mod labels;
pub mod preprocess;
pub mod backend;
pub mod tflite;
pub mod inference;
pub mod shared;

pub use labels::{LabelTable, FUNDUS_LABELS, NUM_FUNDUS_CLASSES, UNKNOWN_LABEL};
pub use preprocess::{preprocess_image, decode_image_bytes, decode_image_file, InputTensor, RawImage, INPUT_SHAPE, INPUT_SIZE};
pub use backend::{ClassifierModel, ModelSource};
pub use tflite::TfliteModel;
pub use inference::{argmax, InferenceEngine, Prediction};
pub use shared::SharedEngine;
