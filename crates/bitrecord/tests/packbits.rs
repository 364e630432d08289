use bitrecord::{
    errors::BitPackError,
    packbits::{chunk_layout, pack_bits, unpack_bits, unpack_bits_signed},
};

fn ramp(count: usize, bits: usize) -> Vec<u8> {
    (0..count).map(|i| (i % (1 << bits)) as u8).collect()
}

#[test]
fn test_three_bit_samples() {
    let data: Vec<u8> = [0b0000_0101, 0b0011_1001, 0b0111_0111].repeat(32);
    assert_eq!(data.len(), 96);

    let samples = unpack_bits(&data, 3).unwrap();
    assert_eq!(samples, ramp(256, 3));
    assert_eq!(pack_bits(&samples, 3).unwrap(), data);

    let mut too_big = samples.clone();
    too_big[10] = 8;
    assert_eq!(
        pack_bits(&too_big, 3),
        Err(BitPackError::ValueOverflow {
            index: 10,
            value: 8,
            bits: 3
        })
    );
}

#[test]
fn test_round_trip_all_widths() {
    for bits in 1..=8 {
        let (chunk_bytes, samples_per_chunk) = chunk_layout(bits).unwrap();
        let samples = ramp(samples_per_chunk * 5, bits);

        let packed = pack_bits(&samples, bits).unwrap();
        assert_eq!(packed.len(), chunk_bytes * 5, "bits = {bits}");
        assert_eq!(unpack_bits(&packed, bits).unwrap(), samples, "bits = {bits}");
    }
}

#[test]
fn test_known_layouts() {
    assert_eq!(unpack_bits(&[0b1010_0101], 2).unwrap(), vec![2, 2, 1, 1]);
    assert_eq!(unpack_bits(&[0xAB, 0xCD], 4).unwrap(), vec![0xA, 0xB, 0xC, 0xD]);
    assert_eq!(unpack_bits(&[7, 200], 8).unwrap(), vec![7, 200]);
}

#[test]
fn test_signed_samples() {
    let data = [0b0111_0011, 0b1011_1111];
    assert_eq!(unpack_bits_signed(&data, 2).unwrap(), vec![1, -1, 0, -1, -2, -1, -1, -1]);
}

#[test]
fn test_wide_samples_rejected() {
    assert_eq!(chunk_layout(9), Err(BitPackError::UnsupportedWidth(9)));
    assert_eq!(unpack_bits(&[0; 2], 16), Err(BitPackError::UnsupportedWidth(16)));
}
