//! End-to-end multi-target decode benchmarks.
//!
//! Sources are staggered so instances finish at different steps; with
//! compaction the decoder batch shrinks as they do.

use candle_core::{DType, Device, Tensor};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use mimo_core::generation::{GenerationConfig, GenerationModel};
use mimo_core::model::{batch_tensors, Decoder, Encoder, MimoModel, TargetDecoder, TargetDecoders};
use mimo_core::vocab::{SpecialTokens, BOS, EOS};

const VOCAB: usize = 512;
const D_MODEL: usize = 32;

struct ConstEncoder;

impl Encoder for ConstEncoder {
    fn forward(&self, src_seq: &Tensor, _src_pos: &Tensor) -> mimo_core::Result<Tensor> {
        let (batch, len) = src_seq.dims2()?;
        Ok(Tensor::ones((batch, len, D_MODEL), DType::F32, src_seq.device())?)
    }
}

/// Prefers EOS once the target is as long as the source's second token.
struct LengthDecoder {
    max_len: usize,
}

impl Decoder for LengthDecoder {
    fn forward(
        &self,
        tgt_seq: &Tensor,
        _tgt_pos: &Tensor,
        src_seq: &Tensor,
        _enc_output: &Tensor,
    ) -> mimo_core::Result<Tensor> {
        let (rows, len) = tgt_seq.dims2()?;
        let src = src_seq.to_vec2::<u32>()?;
        let mut hidden = Vec::with_capacity(rows * len * VOCAB);
        for row in &src {
            let wants_eos = len as u32 >= row[1];
            for _ in 0..len {
                hidden.extend((0..VOCAB).map(|v| match v as u32 {
                    EOS if wants_eos => 5.0,
                    EOS => -5.0,
                    v => ((v * 31) % 17) as f32 / 17.0,
                }));
            }
        }
        Ok(Tensor::from_vec(hidden, (rows, len, VOCAB), tgt_seq.device())?)
    }

    fn project(&self, hidden: &Tensor) -> mimo_core::Result<Tensor> {
        Ok(hidden.clone())
    }

    fn max_seq_len(&self) -> usize {
        self.max_len
    }
}

fn generation_model(targets: usize, beam_size: usize) -> GenerationModel {
    let mut decoders = TargetDecoders::new();
    for t in 0..targets {
        decoders.insert(
            format!("<target_{}>", t),
            TargetDecoder::new(Box::new(LengthDecoder { max_len: 12 })),
        );
    }
    let model = MimoModel::new(Box::new(ConstEncoder), decoders, Device::Cpu);
    let config = GenerationConfig::new(beam_size, 1).with_special_tokens(SpecialTokens::default());
    GenerationModel::new(model, config).unwrap()
}

fn staggered_sources(batch: usize) -> (Tensor, Tensor) {
    let seqs: Vec<Vec<u32>> = (0..batch)
        .map(|i| vec![BOS, 1 + (i % 10) as u32, 7, 8, 9, EOS])
        .collect();
    batch_tensors(&seqs, SpecialTokens::default().pad, &Device::Cpu).unwrap()
}

fn bench_translate_vs_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("translate_vs_batch");
    let generator = generation_model(1, 5);

    for batch in [1usize, 8, 32].iter() {
        let (src_seq, src_pos) = staggered_sources(*batch);
        group.throughput(Throughput::Elements(*batch as u64));

        group.bench_with_input(BenchmarkId::new("batch", batch), batch, |b, _| {
            b.iter(|| {
                black_box(
                    generator
                        .translate_batch(black_box(&src_seq), &src_pos, None)
                        .unwrap(),
                )
            })
        });
    }

    group.finish();
}

fn bench_translate_vs_targets(c: &mut Criterion) {
    let mut group = c.benchmark_group("translate_vs_targets");
    let (src_seq, src_pos) = staggered_sources(8);

    for targets in [1usize, 4, 16].iter() {
        let generator = generation_model(*targets, 5);
        group.throughput(Throughput::Elements(*targets as u64));

        group.bench_with_input(BenchmarkId::new("targets", targets), targets, |b, _| {
            b.iter(|| {
                black_box(
                    generator
                        .translate_batch(black_box(&src_seq), &src_pos, None)
                        .unwrap(),
                )
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_translate_vs_batch, bench_translate_vs_targets);

criterion_main!(benches);
