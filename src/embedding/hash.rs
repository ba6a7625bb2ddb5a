use async_trait::async_trait;

use super::Embedder;
use crate::core::errors::ApiError;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;
const BIGRAM_WEIGHT: f32 = 1.5;

/// Feature-hashing embedder over character unigrams and bigrams.
///
/// Works on CJK text without tokenisation. Identical inputs always map to the
/// same unit vector, and texts sharing characters land close together.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    pub fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0f32; self.dimension];
        let chars: Vec<char> = text
            .to_lowercase()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();

        for c in &chars {
            let mut buf = [0u8; 4];
            self.accumulate(&mut vector, c.encode_utf8(&mut buf).as_bytes(), 1.0);
        }
        for pair in chars.windows(2) {
            let feature: String = pair.iter().collect();
            self.accumulate(&mut vector, feature.as_bytes(), BIGRAM_WEIGHT);
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut vector {
                *x /= norm;
            }
        }
        vector
    }

    fn accumulate(&self, vector: &mut [f32], feature: &[u8], weight: f32) {
        let hash = fnv1a(feature);
        let idx = (hash % self.dimension as u64) as usize;
        let sign = if (hash >> 63) & 1 == 0 { 1.0 } else { -1.0 };
        vector[idx] += sign * weight;
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(FNV_PRIME)
    })
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn name(&self) -> &str {
        "hash"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
        Ok(inputs.iter().map(|text| self.embed_one(text)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_math::cosine_similarity;

    #[test]
    fn identical_inputs_produce_identical_unit_vectors() {
        let embedder = HashEmbedder::new(64);
        let a = embedder.embed_one("七夕海边约会");
        let b = embedder.embed_one("七夕海边约会");
        assert_eq!(a, b);
        let norm = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn empty_input_is_zero_vector() {
        let embedder = HashEmbedder::new(16);
        assert!(embedder.embed_one("   ").iter().all(|x| *x == 0.0));
    }

    #[test]
    fn overlapping_text_scores_higher_than_unrelated_text() {
        let embedder = HashEmbedder::new(384);
        let query = embedder.embed_one("海边约会");
        let related = embedder.embed_one("浪漫的海边约会：看日落，沙滩散步");
        let unrelated = embedder.embed_one("quarterly tax filing deadline");

        assert!(
            cosine_similarity(&query, &related).unwrap()
                > cosine_similarity(&query, &unrelated).unwrap()
        );
    }

    #[tokio::test]
    async fn fingerprint_includes_dimension() {
        let embedder = HashEmbedder::new(32);
        assert_eq!(embedder.fingerprint(), "hash:32");
        let vectors = embedder.embed(&["a".to_string(), "b".to_string()]).await.unwrap();
        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[0].len(), 32);
    }
}
