use resound_formats::WaveFormatTag;

/// Normalizes a playback position into the body of a looped source.
///
/// Positions inside the body pass through unchanged. Positions past the end
/// of a looped source wrap back into the loop region. XMA positions pass
/// through untouched since the hardware decoder handles looping itself, and
/// a degenerate loop region (loop start at the sample count) leaves the
/// position alone.
pub fn convert_looped_position(sample_position: u64, sample_count: u64, loop_start: i32, format: WaveFormatTag) -> u64 {
    if format == WaveFormatTag::Xma {
        return sample_position;
    }

    if loop_start < 0 || sample_position < sample_count {
        return sample_position;
    }

    let loop_start = loop_start as u64;
    let loop_size = sample_count - loop_start.min(sample_count);
    if loop_size == 0 {
        return sample_position;
    }

    loop_start + (sample_position - loop_start) % loop_size
}

#[cfg(test)]
mod tests {
    use resound_formats::WaveFormatTag;

    use super::convert_looped_position;

    const SAMPLE_COUNT: u64 = 4410;
    const LOOP_START: i32 = 1000;

    fn convert(sample_position: u64) -> u64 {
        convert_looped_position(sample_position, SAMPLE_COUNT, LOOP_START, WaveFormatTag::Pcm)
    }

    #[test]
    fn positions_inside_the_body_pass_through() {
        assert_eq!(convert(0), 0);
        assert_eq!(convert(999), 999);
        assert_eq!(convert(4409), 4409);
    }

    #[test]
    fn end_of_body_wraps_to_loop_start() {
        assert_eq!(convert(SAMPLE_COUNT), LOOP_START as u64);
    }

    #[test]
    fn positions_past_the_end_wrap_into_the_loop_region() {
        assert_eq!(convert(5410), 2000);
        assert_eq!(convert(8820), 2000);
        assert_eq!(convert(SAMPLE_COUNT + 3410), LOOP_START as u64);
    }

    #[test]
    fn conversion_is_idempotent() {
        for sample_position in [0, 1000, 4409, 4410, 5410, 8820, 100_000] {
            let converted = convert(sample_position);
            assert_eq!(convert(converted), converted);
        }
    }

    #[test]
    fn unlooped_sources_pass_through() {
        for sample_position in [0, 4409, 4410, 100_000] {
            assert_eq!(
                convert_looped_position(sample_position, SAMPLE_COUNT, -1, WaveFormatTag::Pcm),
                sample_position
            );
        }
    }

    #[test]
    fn degenerate_loop_region_passes_through() {
        assert_eq!(
            convert_looped_position(5000, SAMPLE_COUNT, SAMPLE_COUNT as i32, WaveFormatTag::Pcm),
            5000
        );
    }

    #[test]
    fn xma_positions_are_left_to_the_decoder() {
        assert_eq!(
            convert_looped_position(100_000, SAMPLE_COUNT, LOOP_START, WaveFormatTag::Xma),
            100_000
        );
    }
}
