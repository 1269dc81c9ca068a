use rand::Rng;

pub const CODE_LEN: usize = 8;
const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Source of fresh referral codes. Held in the app state and handed to the
/// registration routine, which asks for one code per insert attempt.
pub trait ReferralCodeGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Uniformly random codes from `[A-Z0-9]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomReferralCodes;

impl ReferralCodeGenerator for RandomReferralCodes {
    fn generate(&self) -> String {
        let mut rng = rand::thread_rng();
        (0..CODE_LEN)
            .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
            .collect()
    }
}

pub fn is_well_formed(code: &str) -> bool {
    code.len() == CODE_LEN
        && code
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
}
