//! Exact substring search used to skip files before they are parsed.
//!
//! The vectorized path broadcasts the first and last needle byte into two
//! 16-byte registers and compares both against a window of the haystack (the
//! second load shifted by `k - 1`). Only bit positions where both compares hit
//! get the interior bytes checked, with a comparator picked from a table keyed
//! by needle length. Vector loads are issued only while the whole `16 + k - 1`
//! byte window lies inside the haystack; the remainder is scanned scalar.

use tracing::trace;

const LANES: usize = 16;

/// Longest needle served by the word-compare table
const MAX_SPECIALIZED_NEEDLE: usize = 12;

type InteriorEq = fn(&[u8], &[u8]) -> bool;

/// Compares exactly `N` bytes using the widest words that fit.
#[inline(always)]
fn words_eq<const N: usize>(a: &[u8], b: &[u8]) -> bool {
    let (a, b) = (&a[..N], &b[..N]);
    let mut i = 0;
    let mut equal = true;
    while i + 8 <= N {
        equal &= read_u64(&a[i..]) == read_u64(&b[i..]);
        i += 8;
    }
    if i + 4 <= N {
        equal &= read_u32(&a[i..]) == read_u32(&b[i..]);
        i += 4;
    }
    if i + 2 <= N {
        equal &= read_u16(&a[i..]) == read_u16(&b[i..]);
        i += 2;
    }
    if i < N {
        equal &= a[i] == b[i];
    }
    equal
}

#[inline(always)]
fn read_u64(bytes: &[u8]) -> u64 {
    let mut word = [0u8; 8];
    word.copy_from_slice(&bytes[..8]);
    u64::from_ne_bytes(word)
}

#[inline(always)]
fn read_u32(bytes: &[u8]) -> u32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&bytes[..4]);
    u32::from_ne_bytes(word)
}

#[inline(always)]
fn read_u16(bytes: &[u8]) -> u16 {
    u16::from_ne_bytes([bytes[0], bytes[1]])
}

/// Interior comparators indexed by `needle.len() - 2`; the first and last
/// bytes are already confirmed by the vector compare.
const INTERIOR_EQ: [InteriorEq; MAX_SPECIALIZED_NEEDLE - 1] = [
    words_eq::<0>,
    words_eq::<1>,
    words_eq::<2>,
    words_eq::<3>,
    words_eq::<4>,
    words_eq::<5>,
    words_eq::<6>,
    words_eq::<7>,
    words_eq::<8>,
    words_eq::<9>,
    words_eq::<10>,
];

fn interior_eq_any(a: &[u8], b: &[u8]) -> bool {
    a == b
}

/// Returns the offset of the first occurrence of `needle` in `haystack`.
///
/// An empty needle matches at offset 0; a needle longer than the haystack
/// never matches.
pub fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    let n = haystack.len();
    let k = needle.len();

    if k == 0 {
        return Some(0);
    }
    if k > n {
        return None;
    }

    let found = match k {
        1 => memchr::memchr(needle[0], haystack),
        2..=MAX_SPECIALIZED_NEEDLE => find_with(haystack, needle, INTERIOR_EQ[k - 2]),
        _ => find_with(haystack, needle, interior_eq_any),
    };

    found.filter(|&pos| pos <= n - k)
}

/// Whether `needle` occurs anywhere in `haystack`
pub fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    find(haystack, needle).is_some()
}

/// Cheap "could this file match" test bound to one query literal
#[derive(Debug, Clone)]
pub struct Prefilter {
    needle: Vec<u8>,
}

impl Prefilter {
    pub fn new(needle: impl Into<Vec<u8>>) -> Self {
        Self {
            needle: needle.into(),
        }
    }

    pub fn needle(&self) -> &[u8] {
        &self.needle
    }

    pub fn matches(&self, haystack: &[u8]) -> bool {
        let hit = contains(haystack, &self.needle);
        if !hit {
            trace!("Prefilter miss over {} bytes", haystack.len());
        }
        hit
    }
}

#[inline(always)]
fn find_with(haystack: &[u8], needle: &[u8], interior_eq: InteriorEq) -> Option<usize> {
    debug_assert!(needle.len() >= 2 && needle.len() <= haystack.len());

    #[cfg(target_arch = "x86_64")]
    {
        find_sse2(haystack, needle, interior_eq)
    }
    #[cfg(not(target_arch = "x86_64"))]
    {
        find_scalar(haystack, needle, 0, interior_eq)
    }
}

#[cfg(target_arch = "x86_64")]
#[inline(always)]
fn find_sse2(haystack: &[u8], needle: &[u8], interior_eq: InteriorEq) -> Option<usize> {
    use std::arch::x86_64::{
        __m128i, _mm_and_si128, _mm_cmpeq_epi8, _mm_loadu_si128, _mm_movemask_epi8,
        _mm_set1_epi8,
    };

    let n = haystack.len();
    let k = needle.len();
    let interior = &needle[1..k - 1];
    let ptr = haystack.as_ptr();
    let mut i = 0;

    // SAFETY: SSE2 is part of the x86_64 baseline. The loop condition keeps
    // both unaligned 16-byte loads (at `i` and `i + k - 1`) inside `haystack`.
    unsafe {
        let first = _mm_set1_epi8(needle[0] as i8);
        let last = _mm_set1_epi8(needle[k - 1] as i8);

        while i + k - 1 + LANES <= n {
            let block_first = _mm_loadu_si128(ptr.add(i) as *const __m128i);
            let block_last = _mm_loadu_si128(ptr.add(i + k - 1) as *const __m128i);

            let eq_first = _mm_cmpeq_epi8(first, block_first);
            let eq_last = _mm_cmpeq_epi8(last, block_last);

            let mut mask = _mm_movemask_epi8(_mm_and_si128(eq_first, eq_last)) as u32;
            while mask != 0 {
                let pos = i + mask.trailing_zeros() as usize;
                if interior_eq(&haystack[pos + 1..pos + k - 1], interior) {
                    return Some(pos);
                }
                mask &= mask - 1;
            }

            i += LANES;
        }
    }

    find_scalar(haystack, needle, i, interior_eq)
}

/// Scalar scan over the candidates starting at `from`
#[inline(always)]
fn find_scalar(haystack: &[u8], needle: &[u8], from: usize, interior_eq: InteriorEq) -> Option<usize> {
    let k = needle.len();
    let last_start = haystack.len() - k;
    let (first, last) = (needle[0], needle[k - 1]);
    let interior = &needle[1..k - 1];

    (from..=last_start).find(|&pos| {
        haystack[pos] == first
            && haystack[pos + k - 1] == last
            && interior_eq(&haystack[pos + 1..pos + k - 1], interior)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn naive(haystack: &[u8], needle: &[u8]) -> Option<usize> {
        if needle.is_empty() {
            return Some(0);
        }
        haystack.windows(needle.len()).position(|w| w == needle)
    }

    #[test]
    fn test_empty_needle_matches_at_zero() {
        assert_eq!(find(b"struct Foo", b""), Some(0));
        assert_eq!(find(b"", b""), Some(0));
    }

    #[test]
    fn test_needle_longer_than_haystack() {
        assert_eq!(find(b"abc", b"abcd"), None);
        assert_eq!(find(b"", b"a"), None);
    }

    #[test]
    fn test_every_specialized_length() {
        let haystack: Vec<u8> = (0..200u32).map(|i| b'a' + (i % 23) as u8).collect();
        for k in 1..=20 {
            for start in [0, 1, 15, 16, 17, 63, 200 - k] {
                let needle = &haystack[start..start + k];
                assert_eq!(
                    find(&haystack, needle),
                    naive(&haystack, needle),
                    "k={} start={}",
                    k,
                    start
                );
            }
        }
    }

    #[test]
    fn test_match_in_scalar_tail() {
        // Long needle near the end leaves no room for a full vector window.
        let mut haystack = vec![b'x'; 40];
        haystack.extend_from_slice(b"reinterpret_cast");
        assert_eq!(find(&haystack, b"reinterpret_cast"), Some(40));
        assert_eq!(find(&haystack, b"_cast"), Some(51));
    }

    #[test]
    fn test_first_and_last_bytes_agree_but_interior_differs() {
        let haystack = b"static_cost static_cast";
        assert_eq!(find(haystack, b"static_cast"), Some(12));
        assert_eq!(find(b"abXdabcd", b"abcd"), Some(4));
    }

    #[test]
    fn test_absent_needle() {
        let haystack = b"void bar() { Foo f; }\n".repeat(10);
        assert_eq!(find(&haystack, b"Baz"), None);
        assert_eq!(find(&haystack, b"dynamic_cast<"), None);
        assert_eq!(find(&haystack, b"q"), None);
    }

    #[test]
    fn test_returns_first_of_many() {
        let haystack = b"Foo Foo Foo Foo Foo Foo Foo Foo";
        assert_eq!(find(haystack, b"Foo"), Some(0));
        assert_eq!(find(&haystack[1..], b"Foo"), Some(3));
    }

    #[test]
    fn test_prefilter_matches() {
        let filter = Prefilter::new("Foo");
        assert!(filter.matches(b"struct Foo {};"));
        assert!(!filter.matches(b"struct Bar {};"));
        assert!(Prefilter::new("").matches(b""));
    }
}
