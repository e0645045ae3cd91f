//! Relation decode example.
//!
//! Builds a vocabulary from a tiny corpus, wires an untrained
//! embedding encoder/decoder pair for two relation targets and prints the
//! n-best values for every target.

use anyhow::Result;
use candle_core::{DType, Tensor};
use candle_nn::{Embedding, Linear, Module, VarBuilder, VarMap};
use mimo::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

const D_MODEL: usize = 16;

const CORPUS: &str = r#"[
    {
        "_id": "Q1",
        "summary": "john smith was a rugby player",
        "mentions": [[["born", "in"], ["john", "smith"], ["was"]]],
        "relations": {"sport": ["rugby", "union"], "given name": ["john"]}
    },
    {
        "_id": "Q2",
        "summary": "mary jones played chess",
        "mentions": [[[], ["mary", "jones"], ["played", "chess"]]],
        "relations": {"sport": ["chess"], "given name": ["mary"]}
    }
]"#;

/// Embeds source tokens.
struct EmbeddingEncoder {
    embed: Embedding,
}

impl Encoder for EmbeddingEncoder {
    fn forward(&self, src_seq: &Tensor, _src_pos: &Tensor) -> mimo::Result<Tensor> {
        Ok(self.embed.forward(src_seq)?)
    }
}

/// Adds the mean encoder state to each target embedding.
struct MeanPoolDecoder {
    embed: Embedding,
    proj: Linear,
    max_len: usize,
}

impl Decoder for MeanPoolDecoder {
    fn forward(
        &self,
        tgt_seq: &Tensor,
        _tgt_pos: &Tensor,
        _src_seq: &Tensor,
        enc_output: &Tensor,
    ) -> mimo::Result<Tensor> {
        let context = enc_output.mean_keepdim(1)?;
        Ok(self.embed.forward(tgt_seq)?.broadcast_add(&context)?)
    }

    fn project(&self, hidden: &Tensor) -> mimo::Result<Tensor> {
        Ok(self.proj.forward(hidden)?)
    }

    fn max_seq_len(&self) -> usize {
        self.max_len
    }
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let device = Device::Cpu;
    let table = TargetTable::default();
    let instances: Vec<Instance> = serde_json::from_str(CORPUS)?;

    let mut rng = StdRng::seed_from_u64(7);
    let pairs: Vec<_> = instances
        .iter()
        .flat_map(|instance| encode_instance(instance, &table, 50, &mut rng))
        .collect();
    println!("Encoded {} instances", pairs.len());

    let mut sequences: Vec<Vec<String>> = pairs.iter().map(|p| p.source.clone()).collect();
    sequences.extend(pairs.iter().flat_map(|p| p.targets.values().cloned()));
    let vocab = VocabBuilder::new(SpecialTokens::default())
        .relation_markers(table.markers().map(String::from))
        .extend(&sequences)
        .build()?;
    println!("Vocab size: {}", vocab.len());

    let varmap = VarMap::new();
    let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
    let encoder = EmbeddingEncoder {
        embed: candle_nn::embedding(vocab.len(), D_MODEL, vb.pp("encoder"))?,
    };

    let mut model = MimoModel::new(Box::new(encoder), TargetDecoders::new(), device);
    for marker in ["<given_name>", "<sport>"] {
        let spec = table
            .get(marker)
            .ok_or_else(|| anyhow::anyhow!("unknown target {marker}"))?;
        let vb = vb.pp(marker.trim_matches(|c| c == '<' || c == '>'));
        let decoder = MeanPoolDecoder {
            embed: candle_nn::embedding(vocab.len(), D_MODEL, vb.pp("embed"))?,
            proj: candle_nn::linear(D_MODEL, vocab.len(), vb.pp("proj"))?,
            max_len: spec.max_len + 1,
        };
        model.add_target(marker, TargetDecoder::new(Box::new(decoder)));
    }

    let generator = Generator::builder().beam_size(4).n_best(2).build(model)?;

    let sources: Vec<Vec<u32>> = pairs.iter().map(|p| vocab.encode(&p.source)).collect();
    let results = generator.generate(&sources)?;

    for target in render(&results, &vocab) {
        println!("{}", target.target);
        for (pair, hyps) in pairs.iter().zip(&target.instances) {
            for (words, score) in hyps {
                println!("  {} {:>8.3}  {}", pair.id, score, words.join(" "));
            }
        }
    }

    Ok(())
}
