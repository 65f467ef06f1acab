pub mod utxo_collection;
pub mod utxo_diff;
pub mod utxo_error;
pub mod utxo_view;

pub use utxo_collection::{UtxoCollection, UtxoCollectionExtensions};
pub use utxo_diff::UtxoDiff;
pub use utxo_error::{UtxoAlgebraError, UtxoResult};
pub use utxo_view::{ComposedUtxoView, UtxoView};
