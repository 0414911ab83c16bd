use crate::math::{A2_OP, A_OP};
use num_complex::Complex64;

/// Sequence quantities ordered `[zero, positive, negative]`.
pub type Seq = [Complex64; 3];

/// Phase quantities ordered `[A, B, C]`.
pub type Abc = [Complex64; 3];

/// Returns the symmetrical-component transformation matrix
///
/// ```txt
///     | 1  1   1  |
/// A = | 1  a   a2 |
///     | 1  a2  a  |
/// ```
///
/// where `a = exp(j 2pi/3)`.
pub fn a_matrix() -> [[Complex64; 3]; 3] {
    let one = Complex64::new(1.0, 0.0);
    [[one, one, one], [one, A_OP, A2_OP], [one, A2_OP, A_OP]]
}

/// Inverse transformation matrix, `(1/3) conj(A)`.
pub fn a_inverse() -> [[Complex64; 3]; 3] {
    let mut inv = a_matrix();
    for row in inv.iter_mut() {
        for v in row.iter_mut() {
            *v = v.conj() / 3.0;
        }
    }
    inv
}

fn mul(m: &[[Complex64; 3]; 3], x: &[Complex64; 3]) -> [Complex64; 3] {
    let mut y = [Complex64::default(); 3];
    for (i, row) in m.iter().enumerate() {
        y[i] = row[0] * x[0] + row[1] * x[1] + row[2] * x[2];
    }
    y
}

/// Transforms `[X0, X1, X2]` into `[XA, XB, XC]`.
pub fn seq_to_phase(seq: &Seq) -> Abc {
    mul(&a_matrix(), seq)
}

/// Transforms `[XA, XB, XC]` into `[X0, X1, X2]`.
pub fn phase_to_seq(abc: &Abc) -> Seq {
    mul(&a_inverse(), abc)
}
