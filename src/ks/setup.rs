//! Switching-key generation

use serde::{Deserialize, Serialize};

use crate::ckks::SecretKey;
use crate::math::{ModQ, RingContext, RnsPoly, Sampler};

/// One digit of a switching key, over every Q and P prime in NTT form
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchingRow {
    pub b: RnsPoly,
    pub a: RnsPoly,
}

/// Switching key from s' to s with one digit per Q prime:
/// ```text
/// K[i] = (-a_i·s + e_i + P·[i == j]·s' mod q_j,  a_i)
/// ```
/// Mod each auxiliary prime the P·s' term vanishes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchingKey {
    pub rows: Vec<SwitchingRow>,
}

impl SwitchingKey {
    /// Highest ciphertext level this key can switch
    pub fn max_level(&self) -> usize {
        self.rows.len().saturating_sub(1)
    }
}

/// Key for the automorphism X -> X^g
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GaloisKey {
    pub galois_element: u64,
    pub key: SwitchingKey,
}

/// Key switching s² back to s after a ciphertext product
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelinearizationKey {
    pub key: SwitchingKey,
}

/// Generate the switching key from `from` (NTT form over Q∪P) to `to`
pub fn generate_switching_key(
    ring: &RingContext,
    from: &RnsPoly,
    to: &SecretKey,
    sampler: &mut Sampler,
) -> SwitchingKey {
    let n = ring.dimension();
    let moduli = ring.qp_moduli(ring.max_level());
    let digits = ring.max_level() + 1;

    let rows = (0..digits)
        .map(|i| {
            // Uniform residues are uniform in either domain
            let mut a = sampler.uniform_poly(n, &moduli);
            a.force_ntt_domain();
            let e = ring.to_ntt_new(&sampler.gaussian_poly(n, &moduli));

            let mut b = e;
            b -= &ring.mul(&a, &to.poly);

            let qi = moduli[i];
            let p_mod = ring.p_mod(qi);
            for (x, &y) in b.limb_mut(i).iter_mut().zip(from.limb(i)) {
                *x = ModQ::add(*x, ModQ::mul(y, p_mod, qi), qi);
            }

            SwitchingRow { b, a }
        })
        .collect();

    SwitchingKey { rows }
}

/// Galois key for element `g`: switches τ_g(s) back to s
pub fn generate_galois_key(ring: &RingContext, sk: &SecretKey, g: u64, sampler: &mut Sampler) -> GaloisKey {
    let s_coeff = ring.from_ntt_new(&sk.poly);
    let rotated = ring.to_ntt_new(&ring.automorphism(&s_coeff, g));
    GaloisKey {
        galois_element: g,
        key: generate_switching_key(ring, &rotated, sk, sampler),
    }
}

/// Relinearization key: switches s² back to s
pub fn generate_relinearization_key(
    ring: &RingContext,
    sk: &SecretKey,
    sampler: &mut Sampler,
) -> RelinearizationKey {
    let s_squared = ring.mul(&sk.poly, &sk.poly);
    RelinearizationKey {
        key: generate_switching_key(ring, &s_squared, sk, sampler),
    }
}
