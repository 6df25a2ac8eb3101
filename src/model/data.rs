use burn::data::dataloader::batcher::Batcher;
use burn::data::dataset::Dataset;
use burn::prelude::*;

use crate::model::examples::{EncodedExample, sort_and_pad};
use crate::text::TokenId;

/// One sentence of an example: its ids and its position in the sentence file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionItem {
    pub ids: Vec<TokenId>,
    pub index: usize,
}

impl AsRef<[TokenId]> for CaptionItem {
    fn as_ref(&self) -> &[TokenId] {
        &self.ids
    }
}

impl Dataset<CaptionItem> for EncodedExample {
    fn len(&self) -> usize {
        self.num_sentences()
    }

    fn get(&self, index: usize) -> Option<CaptionItem> {
        let ids = self.row_ids(index)?.to_vec();
        Some(CaptionItem {
            ids,
            index: self.sorted_indices()[index],
        })
    }
}

#[derive(Clone, Default)]
pub struct CaptionBatcher {}

#[derive(Clone, Debug)]
pub struct CaptionBatch<B: Backend> {
    pub captions: Tensor<B, 2, Int>, // Shape: [num_sentences, max_len]
    pub lengths: Tensor<B, 1, Int>,
    pub sorted_indices: Tensor<B, 1, Int>,
}

impl<B: Backend> Batcher<B, CaptionItem, CaptionBatch<B>> for CaptionBatcher {
    fn batch(&self, items: Vec<CaptionItem>, device: &B::Device) -> CaptionBatch<B> {
        let sorted = sort_and_pad(&items);
        let rows = sorted.rows.len();

        let captions: Vec<i64> = sorted.rows.into_iter().flatten().map(i64::from).collect();
        let lengths: Vec<i64> = sorted.lengths.iter().map(|&len| len as i64).collect();
        let sorted_indices: Vec<i64> = sorted
            .order
            .iter()
            .map(|&ix| items[ix].index as i64)
            .collect();

        CaptionBatch {
            captions: Tensor::from_data(
                TensorData::new(captions, [rows, sorted.max_len]).convert::<B::IntElem>(),
                device,
            ),
            lengths: Tensor::from_data(
                TensorData::new(lengths, [rows]).convert::<B::IntElem>(),
                device,
            ),
            sorted_indices: Tensor::from_data(
                TensorData::new(sorted_indices, [rows]).convert::<B::IntElem>(),
                device,
            ),
        }
    }
}

impl EncodedExample {
    /// Moves the example onto `device` as one batch.
    pub fn to_batch<B: Backend>(&self, device: &B::Device) -> CaptionBatch<B> {
        let items = (0..self.num_sentences())
            .filter_map(|ix| self.get(ix))
            .collect();
        CaptionBatcher::default().batch(items, device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::examples::ExampleStats;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn ints<const D: usize>(tensor: Tensor<TestBackend, D, Int>) -> Vec<i64> {
        tensor.into_data().convert::<i64>().to_vec::<i64>().unwrap()
    }

    fn example() -> EncodedExample {
        let captions = vec![vec![2], vec![4, 2, 3], vec![1, 2]];
        EncodedExample::from_captions("birds", &captions, ExampleStats::default()).unwrap()
    }

    #[test]
    fn dataset_yields_rows_with_original_index() {
        let example = example();
        assert_eq!(Dataset::len(&example), 3);
        assert_eq!(
            example.get(0),
            Some(CaptionItem {
                ids: vec![4, 2, 3],
                index: 1
            })
        );
        assert_eq!(
            example.get(2),
            Some(CaptionItem {
                ids: vec![2],
                index: 0
            })
        );
        assert_eq!(example.get(3), None);
    }

    #[test]
    fn batch_matches_encoded_example() {
        let device = Default::default();
        let batch = example().to_batch::<TestBackend>(&device);

        assert_eq!(batch.captions.dims(), [3, 3]);
        assert_eq!(ints(batch.captions), vec![4, 2, 3, 1, 2, 0, 2, 0, 0]);
        assert_eq!(ints(batch.lengths), vec![3, 2, 1]);
        assert_eq!(ints(batch.sorted_indices), vec![1, 2, 0]);
    }

    #[test]
    fn batcher_sorts_unordered_items() {
        let device = Default::default();
        let items = vec![
            CaptionItem {
                ids: vec![5],
                index: 0,
            },
            CaptionItem {
                ids: vec![6, 7],
                index: 1,
            },
        ];
        let batch: CaptionBatch<TestBackend> = CaptionBatcher::default().batch(items, &device);

        assert_eq!(ints(batch.captions), vec![6, 7, 5, 0]);
        assert_eq!(ints(batch.lengths), vec![2, 1]);
        assert_eq!(ints(batch.sorted_indices), vec![1, 0]);
    }
}
