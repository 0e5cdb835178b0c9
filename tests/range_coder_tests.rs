use ffv1_rs::Ffv1Error;
use ffv1_rs::range_coder::{NEUTRAL_STATE, ONE_STATE, RangeDecoder, RangeEncoder, ZERO_STATE};

/// Deterministic pseudo-random bits with a skewed distribution.
fn test_bits(n: usize) -> Vec<(usize, bool)> {
    let mut x: u32 = 0x1234_5678;
    (0..n)
        .map(|_| {
            x ^= x << 13;
            x ^= x >> 17;
            x ^= x << 5;
            let context = (x % 4) as usize;
            // Context 0 is mostly ones, context 1 mostly zeros.
            let bit = match context {
                0 => x % 10 != 0,
                1 => x % 10 == 0,
                _ => x & 0x100 != 0,
            };
            (context, bit)
        })
        .collect()
}

#[test]
fn state_tables_match_reference_values() {
    assert_eq!(ONE_STATE[128], 134);
    assert_eq!(ZERO_STATE[128], 122);
    assert_eq!(ONE_STATE[200], 202);
    assert_eq!(ZERO_STATE[200], 190);
    assert_eq!(ONE_STATE[0], 0);
    assert_eq!(ZERO_STATE[0], 0);
}

#[test]
fn state_tables_are_mirrored() {
    for i in 8..=248 {
        assert_eq!(
            ZERO_STATE[i] as usize,
            256 - ONE_STATE[256 - i] as usize,
            "state {i}"
        );
    }
}

#[test]
fn transitions_move_toward_the_outcome() {
    for s in 9..248 {
        assert!(ONE_STATE[s] as usize > s, "one_state[{s}]");
        assert!((ZERO_STATE[s] as usize) < s, "zero_state[{s}]");
    }
    assert_eq!(ONE_STATE[248], 248);
}

#[test]
fn bits_round_trip_with_matching_states() {
    let bits = test_bits(2000);

    let mut enc_states = [NEUTRAL_STATE; 4];
    let mut enc = RangeEncoder::new();
    for &(ctx, bit) in &bits {
        enc.encode_bit(&mut enc_states[ctx], bit);
    }
    let data = enc.terminate();

    let mut dec_states = [NEUTRAL_STATE; 4];
    let mut dec = RangeDecoder::new(&data).unwrap();
    for (i, &(ctx, bit)) in bits.iter().enumerate() {
        assert_eq!(dec.decode_bit(&mut dec_states[ctx]).unwrap(), bit, "bit {i}");
    }
    assert_eq!(dec_states, enc_states);
    assert_eq!(dec.bytes_consumed(), data.len());
}

#[test]
fn skewed_bits_compress() {
    let mut enc = RangeEncoder::new();
    let mut state = NEUTRAL_STATE;
    for _ in 0..4000 {
        enc.encode_bit(&mut state, true);
    }
    let data = enc.terminate();
    assert!(data.len() < 100, "{} bytes for 4000 predictable bits", data.len());
}

#[test]
fn neutral_bits_round_trip() {
    let pattern = [true, false, false, true, true, true, false, true];

    let mut enc = RangeEncoder::new();
    for &bit in &pattern {
        enc.encode_neutral_bit(bit);
    }
    let data = enc.terminate();

    let mut dec = RangeDecoder::new(&data).unwrap();
    for &bit in &pattern {
        assert_eq!(dec.decode_neutral_bit().unwrap(), bit);
    }
}

#[test]
fn empty_input_is_exhausted() {
    assert!(matches!(RangeDecoder::new(&[]), Err(Ffv1Error::InputExhausted)));
}

#[test]
fn terminated_stream_reads_one_byte_ahead() {
    let mut enc = RangeEncoder::new();
    let mut state = 128u8;
    for i in 0..300 {
        enc.encode_bit(&mut state, i % 7 == 0);
    }
    let data = enc.terminate();

    let decode = |input: &[u8]| -> Result<usize, Ffv1Error> {
        let mut dec = RangeDecoder::new(input)?;
        let mut state = 128u8;
        for _ in 0..300 {
            dec.decode_bit(&mut state)?;
        }
        Ok(dec.bytes_consumed())
    };
    assert_eq!(decode(&data).unwrap(), data.len());
    for cut in 1..=2 {
        assert!(matches!(
            decode(&data[..data.len() - cut]),
            Err(Ffv1Error::InputExhausted)
        ));
    }
}

#[test]
fn reading_far_past_the_end_fails() {
    let mut dec = RangeDecoder::new(&[0x55]).unwrap();
    let result = (0..64).try_for_each(|_| dec.decode_neutral_bit().map(|_| ()));
    assert!(matches!(result, Err(Ffv1Error::InputExhausted)));
}
