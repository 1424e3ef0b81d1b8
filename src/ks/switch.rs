//! Key-switching operation

use crate::error::{crypto_err, Result};
use crate::math::{RingContext, RnsPoly};

use super::setup::SwitchingKey;

/// Switch a polynomial c decrypting under s' to a pair decrypting under s.
///
/// # Algorithm
///
/// 1. Split c by RNS limb: d_i = [c]_{q_i}, lifted to Q_l ∪ P
/// 2. Accumulate (Σ d_i·K[i].b, Σ d_i·K[i].a), which decrypts to P·c·s' + e
/// 3. Divide both parts by P with rounding
///
/// `c` must be in coefficient form at some level l; the result is over Q_l
/// in coefficient form and satisfies d0 + d1·s ≈ c·s'.
pub fn key_switch(ring: &RingContext, c: &RnsPoly, key: &SwitchingKey) -> Result<(RnsPoly, RnsPoly)> {
    if c.is_ntt() {
        return Err(crypto_err!("key switching needs coefficient form"));
    }
    let level = c.num_limbs().checked_sub(1).ok_or_else(|| crypto_err!("empty polynomial"))?;
    if level > key.max_level() {
        return Err(crypto_err!(
            "switching key covers levels up to {}, ciphertext is at level {}",
            key.max_level(),
            level
        ));
    }

    let n = ring.dimension();
    let moduli = ring.qp_moduli(level);
    let key_limbs = ring.qp_limb_indices(level);

    let mut acc0 = RnsPoly::zero(n, &moduli, true);
    let mut acc1 = RnsPoly::zero(n, &moduli, true);

    for (i, row) in key.rows.iter().enumerate().take(level + 1) {
        let mut digit = ring.lift_limb(c, i, &moduli);
        ring.to_ntt(&mut digit);
        ring.mul_acc_mapped(&mut acc0, &digit, &row.b, Some(&key_limbs));
        ring.mul_acc_mapped(&mut acc1, &digit, &row.a, Some(&key_limbs));
    }

    ring.from_ntt(&mut acc0);
    ring.from_ntt(&mut acc1);
    ring.mod_down(&mut acc0)?;
    ring.mod_down(&mut acc1)?;
    Ok((acc0, acc1))
}
