#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use lz4s_frame::{CodecError, DecoderOptions, FrameCodec, FrameDecoder};

// Fuzz target: FrameDecoder gives the same answer however input and output
// are split.
//
// Input format:
//   input_chunks:  sizes of successive source slices (0 treated as 1)
//   output_chunks: sizes of successive destination slices
//   data:          the compressed stream

#[derive(Arbitrary, Debug)]
struct Input {
    input_chunks: Vec<u8>,
    output_chunks: Vec<u8>,
    data: Vec<u8>,
}

fn decode(data: &[u8], input_chunks: &[u8], output_chunks: &[u8]) -> Result<Vec<u8>, CodecError> {
    let mut decoder = FrameDecoder::new(DecoderOptions::default())?;
    let mut out = Vec::new();
    let mut dst = [0u8; 256];
    let mut pos = 0;
    let mut round = 0usize;
    loop {
        let take = input_chunks
            .get(round % input_chunks.len().max(1))
            .map_or(data.len(), |&n| usize::from(n.max(1)));
        let room = output_chunks
            .get(round % output_chunks.len().max(1))
            .map_or(dst.len(), |&n| usize::from(n.max(1)));
        round += 1;

        let end = (pos + take).min(data.len());
        let step = decoder.decode(&data[pos..end], &mut dst[..room])?;
        pos += step.consumed;
        out.extend_from_slice(&dst[..step.produced]);
        if !step.made_progress() {
            break;
        }
        // Cap output so a tiny frame declaring huge blocks stays fast.
        if out.len() > 1 << 20 {
            return Ok(out);
        }
    }
    decoder.finish()?;
    Ok(out)
}

fuzz_target!(|input: Input| {
    let whole = decode(&input.data, &[], &[]);
    let split = decode(&input.data, &input.input_chunks, &input.output_chunks);
    match (whole, split) {
        (Ok(a), Ok(b)) => {
            if a.len() <= 1 << 20 && b.len() <= 1 << 20 {
                assert_eq!(a, b);
            }
        }
        (Err(_), Err(_)) => {}
        (a, b) => {
            // Output caps can cut one run short of the error the other saw.
            let capped = |r: &Result<Vec<u8>, CodecError>| {
                r.as_ref().is_ok_and(|v| v.len() > 1 << 20)
            };
            assert!(capped(&a) || capped(&b), "whole={a:?} split={b:?}");
        }
    }
});
