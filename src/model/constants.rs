use crate::text::TokenId;

pub const PAD_INDEX: TokenId = 0;

pub const TOKEN_PATTERN: &str = r"\w+";

pub const EXAMPLE_MANIFEST: &str = "example_filenames.txt";

pub const SENTENCE_FILE_EXT: &str = "txt";

pub const NUM_BBOX_SAMPLES: usize = 25;
