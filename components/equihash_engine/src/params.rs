use std::fmt;

/// The parameters `(n, k)` did not describe a usable Equihash instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InvalidParams {
    pub n: u32,
    pub k: u32,
}

impl fmt::Display for InvalidParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid Equihash parameters (n = {}, k = {})", self.n, self.k)
    }
}

impl std::error::Error for InvalidParams {}

/// Validated Equihash parameters.
///
/// `n` is the bit length of each leaf digest and `k` the number of collision
/// rounds; a solution consists of `2^k` leaf indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Params {
    pub(crate) n: u32,
    pub(crate) k: u32,
}

impl Params {
    /// Returns an error if the parameters are invalid.
    pub fn new(n: u32, k: u32) -> Result<Self, InvalidParams> {
        // We place the following requirements on the parameters:
        // - n is a multiple of 8, so the hash output has an exact byte length.
        // - k >= 3 so the encoded solutions have an exact byte length.
        // - k < n, so the collision bit length is at least 1.
        // - n is a multiple of k + 1, so we have an integer collision bit length.
        // - n <= 512, so a single BLAKE2b output holds at least one leaf.
        // - the collision bit length is in 8..=24, so collision windows and
        //   packed indices fit the 32-bit accumulators of the codec.
        if (n % 8 == 0) && (k >= 3) && (k < n) && (n % (k + 1) == 0) && (n <= 512) {
            let c_bit_len = n / (k + 1);
            if (8..=24).contains(&c_bit_len) {
                return Ok(Params { n, k });
            }
        }
        Err(InvalidParams { n, k })
    }

    pub fn n(&self) -> u32 {
        self.n
    }

    pub fn k(&self) -> u32 {
        self.k
    }

    pub(crate) fn indices_per_hash_output(&self) -> u32 {
        512 / self.n
    }

    /// The BLAKE2b digest length, in bytes.
    pub(crate) fn hash_output(&self) -> u8 {
        (self.indices_per_hash_output() * self.n / 8) as u8
    }

    /// The length of a single leaf digest, in bytes.
    pub fn digest_len(&self) -> usize {
        (self.n / 8) as usize
    }

    pub fn collision_bit_length(&self) -> usize {
        (self.n / (self.k + 1)) as usize
    }

    pub(crate) fn collision_byte_length(&self) -> usize {
        (self.collision_bit_length() + 7) / 8
    }

    /// The length of a leaf digest once every collision window has been
    /// expanded to a whole number of bytes.
    pub(crate) fn hash_length(&self) -> usize {
        ((self.k as usize) + 1) * self.collision_byte_length()
    }

    /// The number of leaf indices in a solution.
    pub fn solution_len(&self) -> usize {
        1 << self.k
    }

    /// The size of the leaf index space, `2^(n / (k + 1) + 1)`.
    pub fn leaf_count(&self) -> u32 {
        1 << (self.collision_bit_length() + 1)
    }

    /// The length in bytes of a minimally-encoded solution.
    pub fn minimal_len(&self) -> usize {
        // Division is exact because k >= 3.
        (self.solution_len() * (self.collision_bit_length() + 1)) / 8
    }
}
