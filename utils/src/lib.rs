pub mod hex {
    /// Hex rendering for byte containers, used by `Debug` impls of script-carrying types
    pub trait ToHex {
        fn to_hex(&self) -> String;
    }

    impl<T: AsRef<[u8]> + ?Sized> ToHex for T {
        fn to_hex(&self) -> String {
            hex::encode(self.as_ref())
        }
    }
}

pub use serde_bytes;
