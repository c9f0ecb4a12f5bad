use rand::Rng;

const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

pub const DEFAULT_SLUG_LENGTH: usize = 10;
pub const MIN_SLUG_LENGTH: usize = 6;
pub const MAX_SLUG_LENGTH: usize = 32;

/// Generates public thread slugs: lower-case ASCII letters and digits of a
/// fixed length.
#[derive(Debug, Clone, Copy)]
pub struct SlugGenerator {
    len: usize,
}

impl SlugGenerator {
    /// Length is clamped into `MIN_SLUG_LENGTH..=MAX_SLUG_LENGTH`.
    pub fn new(len: usize) -> Self {
        Self {
            len: len.clamp(MIN_SLUG_LENGTH, MAX_SLUG_LENGTH),
        }
    }

    pub fn length(&self) -> usize {
        self.len
    }

    pub fn generate(&self) -> String {
        let mut rng = rand::rng();
        (0..self.len)
            .map(|_| char::from(CHARSET[rng.random_range(0..CHARSET.len())]))
            .collect()
    }

    pub fn is_valid(&self, slug: &str) -> bool {
        slug.len() == self.len && slug.bytes().all(|b| CHARSET.contains(&b))
    }
}

impl Default for SlugGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_SLUG_LENGTH)
    }
}
