use crate::notify::VapidKeys;

/// Print a fresh VAPID keypair in the env var format `AppConfig`
/// reads. The public half is also what browsers pass to
/// `pushManager.subscribe` as the `applicationServerKey`.
pub fn run() {
    let keys = VapidKeys::generate();

    println!("FITPUSH_VAPID_PUBLIC_KEY={}", keys.public_key_base64url());
    println!("FITPUSH_VAPID_PRIVATE_KEY={}", keys.private_key_base64url());
}
