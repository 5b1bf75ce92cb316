//! Generation of the leaf digests that Equihash searches over.

use blake2b_simd::{Hash as Blake2bHash, Params as Blake2bParams, State as Blake2bState};

use crate::params::{InvalidParams, Params};

/// A source of deterministic pseudorandom leaf digests.
///
/// The solvers and the validator only depend on this trait, so the underlying
/// primitive can be replaced without touching them. Implementations must not
/// mutate shared state when producing a digest: the solvers call them
/// concurrently from several threads.
pub trait IndexHasher: Sync {
    /// The parameters the digests are produced for.
    fn params(&self) -> Params;

    /// Writes the `n / 8`-byte digest of leaf `index` into `out`.
    fn leaf_digest(&self, index: u32, out: &mut [u8]);

    /// Writes the digests of consecutive leaves, starting at `start`, into `out`.
    ///
    /// `out` must be a multiple of `n / 8` bytes long.
    fn leaf_digests(&self, start: u32, out: &mut [u8]) {
        let digest_len = self.params().digest_len();
        for (i, digest) in out.chunks_exact_mut(digest_len).enumerate() {
            self.leaf_digest(start + i as u32, digest);
        }
    }
}

/// The BLAKE2b-based leaf digest generator used by the Zcash consensus rules.
///
/// Create it with [`Blake2bHasher::new`], then absorb the block header and
/// nonce with [`Blake2bHasher::update`] before handing it to a solver or
/// validator.
#[derive(Clone)]
pub struct Blake2bHasher {
    params: Params,
    state: Blake2bState,
}

impl Blake2bHasher {
    /// Initializes the hash state for the parameters `(n, k)`.
    pub fn new(n: u32, k: u32) -> Result<Self, InvalidParams> {
        Params::new(n, k).map(Self::from_params)
    }

    pub fn from_params(params: Params) -> Self {
        Blake2bHasher {
            params,
            state: initialise_state(params.n, params.k, params.hash_output()),
        }
    }

    /// Initializes the hash state and absorbs `input` followed by `nonce`.
    pub fn for_input(n: u32, k: u32, input: &[u8], nonce: &[u8]) -> Result<Self, InvalidParams> {
        let mut hasher = Self::new(n, k)?;
        hasher.update(input).update(nonce);
        Ok(hasher)
    }

    /// Appends `data` to the base state.
    pub fn update(&mut self, data: &[u8]) -> &mut Self {
        self.state.update(data);
        self
    }

    fn generate_hash(&self, g: u32) -> Blake2bHash {
        generate_hash(&self.state, g)
    }
}

impl IndexHasher for Blake2bHasher {
    fn params(&self) -> Params {
        self.params
    }

    fn leaf_digest(&self, index: u32, out: &mut [u8]) {
        let p = self.params;
        let hash = self.generate_hash(index / p.indices_per_hash_output());
        let start = ((index % p.indices_per_hash_output()) as usize) * p.digest_len();
        out.copy_from_slice(&hash.as_bytes()[start..start + p.digest_len()]);
    }

    fn leaf_digests(&self, start: u32, out: &mut [u8]) {
        let p = self.params;
        let digest_len = p.digest_len();
        let per_output = p.indices_per_hash_output();

        let mut index = start;
        let mut remaining = out;
        while remaining.len() >= digest_len {
            // Use as many leaves of this BLAKE2b output as are still needed.
            let hash = self.generate_hash(index / per_output);
            let offset = (index % per_output) as usize;
            let count = ((per_output as usize) - offset).min(remaining.len() / digest_len);
            let (head, tail) = remaining.split_at_mut(count * digest_len);
            head.copy_from_slice(
                &hash.as_bytes()[offset * digest_len..(offset + count) * digest_len],
            );
            remaining = tail;
            index += count as u32;
        }
    }
}

fn initialise_state(n: u32, k: u32, digest_len: u8) -> Blake2bState {
    let mut personalization = [0u8; 16];
    personalization[..8].copy_from_slice(b"ZcashPoW");
    personalization[8..12].copy_from_slice(&n.to_le_bytes());
    personalization[12..].copy_from_slice(&k.to_le_bytes());

    Blake2bParams::new()
        .hash_length(digest_len as usize)
        .personal(&personalization)
        .to_state()
}

fn generate_hash(base_state: &Blake2bState, g: u32) -> Blake2bHash {
    let mut state = base_state.clone();
    state.update(&g.to_le_bytes());
    state.finalize()
}
