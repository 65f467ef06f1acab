#[cfg(test)]
mod integration_tests {
    use crate::api::ConsensusApi;
    use crate::config::Config;
    use crate::consensus::storage::pruning::PruningStoreReader;
    use crate::consensus::Consensus;
    use crate::errors::ConsensusError;
    use consensus_core::block::Block;
    use consensus_core::blockstatus::BlockStatus;
    use consensus_core::coinbase::CoinbaseData;
    use consensus_core::constants::TX_VERSION;
    use consensus_core::errors::RuleError;
    use consensus_core::network::NetworkType;
    use consensus_core::subnets::SUBNETWORK_ID_NATIVE;
    use consensus_core::trusted::TrustedBlock;
    use consensus_core::tx::{
        ScriptPublicKey, Transaction, TransactionId, TransactionInput, TransactionOutpoint,
        TransactionOutput, UtxoEntry,
    };
    use consensus_core::Hash;
    use database::{Database, StagingArea};
    use lumen_hashes::calc_merkle_root;
    use tempfile::TempDir;

    fn config() -> Config {
        let mut config = Config::for_network(NetworkType::Simnet);
        config.overrides.coinbase_maturity = Some(0);
        config
    }

    fn open(config: &Config) -> (TempDir, Consensus) {
        let tmp = TempDir::new().unwrap();
        let consensus = Consensus::open(tmp.path(), config).unwrap();
        (tmp, consensus)
    }

    fn script(id: u8) -> ScriptPublicKey {
        ScriptPublicKey::from_vec(0, vec![0x51, id])
    }

    fn miner(id: u8) -> CoinbaseData {
        CoinbaseData::new(script(id), b"test-miner".to_vec())
    }

    /// Builds a block on `parents` paying `script(id)`, without inserting it
    fn build(consensus: &Consensus, parents: &[Hash], id: u8) -> Block {
        consensus.build_block_with_parents(parents, &miner(id), vec![]).unwrap().block
    }

    fn add(consensus: &Consensus, parents: &[Hash], id: u8, txs: Vec<Transaction>) -> Block {
        let block = consensus.build_block_with_parents(parents, &miner(id), txs).unwrap().block;
        consensus.validate_and_insert_block(&block).unwrap();
        block
    }

    fn status(consensus: &Consensus, block: Hash) -> Option<BlockStatus> {
        consensus.get_block_status(block).unwrap()
    }

    fn history_root(consensus: &Consensus) -> Hash {
        consensus.storage().pruning.get_history_root(&StagingArea::new()).unwrap()
    }

    fn reward(
        consensus: &Consensus,
        block: Hash,
        fees: u64,
        to: ScriptPublicKey,
    ) -> TransactionOutput {
        TransactionOutput::new(consensus.calc_block_subsidy(block).unwrap() + fees, to)
    }

    fn has_output(consensus: &Consensus, tx_id: TransactionId) -> bool {
        let outpoint = TransactionOutpoint::new(tx_id, 0);
        consensus.get_virtual_utxo(&outpoint).unwrap().is_some()
    }

    fn accepted_coinbases(consensus: &Consensus, block: Hash) -> Vec<(Hash, bool)> {
        let acceptance = consensus.get_acceptance_data(block).unwrap();
        acceptance
            .iter()
            .map(|entry| (entry.block_hash, entry.accepted_transactions[0].is_accepted))
            .collect()
    }

    fn all_utxos(consensus: &Consensus) -> Vec<(TransactionOutpoint, UtxoEntry)> {
        consensus.get_virtual_utxos(None, usize::MAX).unwrap()
    }

    fn paid_to(utxos: &[(TransactionOutpoint, UtxoEntry)], spk: &ScriptPublicKey) -> Vec<u64> {
        utxos
            .iter()
            .filter(|(_, entry)| entry.script_public_key == *spk)
            .map(|(_, entry)| entry.amount)
            .collect()
    }

    /// Spends output 0 of the first coinbase of `block` to `to`, leaving a fee of 1
    fn spend_coinbase(block: &Block, amount: u64, to: ScriptPublicKey) -> Transaction {
        let outpoint = TransactionOutpoint::new(block.transactions[0].id(), 0);
        Transaction::new(
            TX_VERSION,
            vec![TransactionInput::new(outpoint, vec![], 0, 0)],
            vec![TransactionOutput::new(amount - 1, to)],
            0,
            SUBNETWORK_ID_NATIVE,
            0,
            vec![],
        )
    }

    #[test]
    fn test_genesis_initialization() {
        let config = config();
        let (tmp, consensus) = open(&config);
        let genesis = consensus.genesis_hash();
        let genesis_reward = consensus.params().subsidy_genesis_reward;

        assert_eq!(consensus.get_virtual_selected_parent().unwrap(), genesis);
        assert_eq!(consensus.get_tips().unwrap(), vec![genesis]);
        assert_eq!(consensus.get_virtual_parents().unwrap(), vec![genesis]);
        assert_eq!(consensus.get_block_status(genesis).unwrap(), Some(BlockStatus::UtxoValid));
        assert_eq!(consensus.get_pruning_point().unwrap(), genesis);
        assert_eq!(consensus.calc_block_subsidy(genesis).unwrap(), genesis_reward);
        assert!(all_utxos(&consensus).is_empty());

        // Reopening keeps the existing state instead of re-initializing
        let a = add(&consensus, &[genesis], 1, vec![]);
        drop(consensus);
        let consensus = Consensus::open(tmp.path(), &config).unwrap();
        assert_eq!(consensus.get_virtual_selected_parent().unwrap(), a.hash());
        assert_eq!(consensus.get_tips().unwrap(), vec![a.hash()]);
    }

    #[test]
    fn test_chain_pays_selected_parent() {
        let (_tmp, consensus) = open(&config());
        let genesis = consensus.genesis_hash();
        let genesis_reward = consensus.params().subsidy_genesis_reward;

        let a = add(&consensus, &[genesis], 1, vec![]);
        // A pays the genesis reward, but its own coinbase is only accepted by its chain child
        assert!(all_utxos(&consensus).is_empty());
        let genesis_payout = TransactionOutput::new(genesis_reward, ScriptPublicKey::default());
        assert_eq!(a.transactions[0].outputs, vec![genesis_payout]);

        let b = add(&consensus, &[a.hash()], 2, vec![]);
        let utxos = all_utxos(&consensus);
        assert_eq!(utxos.len(), 1);
        assert_eq!(paid_to(&utxos, &ScriptPublicKey::default()), vec![genesis_reward]);

        let (expected, has_red_reward) =
            consensus.expected_coinbase_transaction(b.hash(), &miner(2)).unwrap();
        assert_eq!(expected.id(), b.transactions[0].id());
        assert!(!has_red_reward);
        assert_eq!(b.transactions[0].outputs, vec![reward(&consensus, a.hash(), 0, script(1))]);

        let acceptance = consensus.get_acceptance_data(b.hash()).unwrap();
        assert_eq!(acceptance.len(), 1);
        assert_eq!(acceptance[0].block_hash, a.hash());
        assert!(acceptance[0].accepted_transactions[0].is_accepted);

        // Blue score and DAA score grow by one per chain block
        assert_eq!(b.header.blue_score, 2);
        assert_eq!(consensus.get_ghostdag_data(b.hash()).unwrap().blue_score, 2);
        assert_eq!(b.header.daa_score, a.header.daa_score + 1);
    }

    #[test]
    fn test_blue_block_rewarded_exactly_once() {
        let (_tmp, consensus) = open(&config());
        let genesis = consensus.genesis_hash();

        let a = add(&consensus, &[genesis], 1, vec![]).hash();
        let b = add(&consensus, &[genesis], 2, vec![]).hash();
        let x = add(&consensus, &[a, b], 3, vec![]).hash();
        let y = add(&consensus, &[a, b], 4, vec![]).hash();
        let z = add(&consensus, &[x, y], 5, vec![]).hash();
        let w = add(&consensus, &[z], 6, vec![]).hash();
        let v = add(&consensus, &[w], 7, vec![]).hash();
        assert_eq!(consensus.get_virtual_selected_parent().unwrap(), v);

        let utxos = all_utxos(&consensus);
        let genesis_reward = consensus.params().subsidy_genesis_reward;
        assert_eq!(paid_to(&utxos, &ScriptPublicKey::default()), vec![genesis_reward]);
        for (id, hash) in [(1, a), (2, b), (3, x), (4, y), (5, z)] {
            let subsidy = consensus.calc_block_subsidy(hash).unwrap();
            assert_eq!(paid_to(&utxos, &script(id)), vec![subsidy], "block {id}");
        }
        // W's reward sits in V's coinbase, which no block accepted yet
        assert!(paid_to(&utxos, &script(6)).is_empty());
        assert!(paid_to(&utxos, &script(7)).is_empty());

        // Of the two merges of A and B, only the selected parent's coinbase counts
        let z_data = consensus.get_ghostdag_data(z).unwrap();
        let other = if z_data.selected_parent == x { y } else { x };
        assert!(accepted_coinbases(&consensus, w).contains(&(z, true)));
        assert_eq!(
            accepted_coinbases(&consensus, z),
            vec![(z_data.selected_parent, true), (other, false)]
        );
    }

    #[test]
    fn test_merge_outside_daa_window_earns_nothing() {
        let mut config = config();
        config.overrides.difficulty_window_size = Some(2);
        let (_tmp, consensus) = open(&config);
        let genesis = consensus.genesis_hash();

        let mut tip = genesis;
        for id in 1..=4 {
            tip = add(&consensus, &[tip], id, vec![]).hash();
        }
        let side = add(&consensus, &[genesis], 9, vec![]).hash();
        let merge = add(&consensus, &[tip, side], 10, vec![]);

        let data = consensus.get_ghostdag_data(merge.hash()).unwrap();
        assert_eq!(data.selected_parent, tip);
        assert!(data.mergeset_blues.contains(&side));
        assert_eq!(merge.header.daa_score, consensus.get_header(tip).unwrap().daa_score + 1);
        assert_eq!(merge.transactions[0].outputs, vec![reward(&consensus, tip, 0, script(4))]);

        add(&consensus, &[merge.hash()], 11, vec![]);
        assert!(paid_to(&all_utxos(&consensus), &script(9)).is_empty());
    }

    #[test]
    fn test_reorg_matches_replay() {
        let config = config();
        let (_tmp, consensus) = open(&config);
        let genesis = consensus.genesis_hash();
        let genesis_reward = consensus.params().subsidy_genesis_reward;

        let a = add(&consensus, &[genesis], 1, vec![]);
        let tx_b = spend_coinbase(&a, genesis_reward, script(0xb));
        let tx_c = spend_coinbase(&a, genesis_reward, script(0xc));
        let b = add(&consensus, &[a.hash()], 2, vec![tx_b.clone()]);
        let c = add(&consensus, &[a.hash()], 3, vec![tx_c.clone()]);
        let d = add(&consensus, &[c.hash()], 4, vec![]);

        assert_eq!(consensus.get_virtual_selected_parent().unwrap(), d.hash());
        let mut tips = consensus.get_tips().unwrap();
        tips.sort();
        let mut expected_tips = vec![b.hash(), d.hash()];
        expected_tips.sort();
        assert_eq!(tips, expected_tips);

        let utxos = all_utxos(&consensus);
        assert!(!has_output(&consensus, tx_b.id()));
        assert!(has_output(&consensus, tx_c.id()));
        assert!(!has_output(&consensus, a.transactions[0].id()));
        // C's fee goes to its miner through D's coinbase
        assert_eq!(d.transactions[0].outputs, vec![reward(&consensus, c.hash(), 1, script(3))]);

        let (_replay_tmp, replay) = open(&config);
        for block in [&a, &c, &d] {
            assert_eq!(replay.validate_and_insert_block(block).unwrap(), BlockStatus::UtxoValid);
        }
        assert_eq!(all_utxos(&replay), utxos);
        let daa_score = consensus.get_virtual_daa_score().unwrap();
        assert_eq!(replay.get_virtual_daa_score().unwrap(), daa_score);

        // Extending B past D moves the virtual back and forth without drift
        let e = add(&consensus, &[b.hash()], 5, vec![]);
        let f = add(&consensus, &[e.hash()], 6, vec![]);
        assert_eq!(consensus.get_virtual_selected_parent().unwrap(), f.hash());
        assert!(has_output(&consensus, tx_b.id()));
        assert!(!has_output(&consensus, tx_c.id()));

        let (_replay_tmp, replay) = open(&config);
        for block in [&a, &b, &e, &f] {
            replay.validate_and_insert_block(block).unwrap();
        }
        assert_eq!(all_utxos(&replay), all_utxos(&consensus));
    }

    #[test]
    fn test_failed_insertion_leaves_database_untouched() {
        let config = config();
        let (tmp, consensus) = open(&config);
        let genesis = consensus.genesis_hash();
        let a = add(&consensus, &[genesis], 1, vec![]);
        let b = build(&consensus, &[a.hash()], 2);

        let before = consensus.storage().db.dump().unwrap();
        consensus.storage().db.close();
        assert!(matches!(consensus.validate_and_insert_block(&b), Err(ConsensusError::Db(_))));
        drop(consensus);

        let db = Database::open(tmp.path()).unwrap();
        assert_eq!(db.dump().unwrap(), before);
        drop(db);

        let consensus = Consensus::open(tmp.path(), &config).unwrap();
        assert_eq!(consensus.get_virtual_selected_parent().unwrap(), a.hash());
        assert_eq!(consensus.get_block_status(b.hash()).unwrap(), None);
        assert_eq!(consensus.validate_and_insert_block(&b).unwrap(), BlockStatus::UtxoValid);
    }

    #[test]
    fn test_what_if_calls_do_not_persist() {
        let (_tmp, consensus) = open(&config());
        let genesis = consensus.genesis_hash();
        let genesis_reward = consensus.params().subsidy_genesis_reward;
        let a = add(&consensus, &[genesis], 1, vec![]);
        add(&consensus, &[a.hash()], 2, vec![]);
        let before = consensus.storage().db.dump().unwrap();

        let tx = spend_coinbase(&a, genesis_reward, script(0xd));
        assert_eq!(consensus.validate_transaction(&tx).unwrap(), 1);
        let template = consensus.build_block_template(&miner(3), vec![tx.clone()]).unwrap();
        assert!(!template.coinbase_has_red_reward);
        assert_eq!(template.selected_parent_hash, consensus.get_virtual_selected_parent().unwrap());
        assert_eq!(consensus.validate_block(&template.block).unwrap(), BlockStatus::UtxoValid);
        assert_eq!(consensus.storage().db.dump().unwrap(), before);
        assert_eq!(consensus.get_block_status(template.block.hash()).unwrap(), None);

        // A transaction spending nothing that exists fails the build
        let missing = spend_coinbase(&template.block, genesis_reward, script(0xe));
        assert!(matches!(
            consensus.build_block_template(&miner(3), vec![missing]),
            Err(ConsensusError::Tx(_))
        ));

        let status = consensus.validate_and_insert_block(&template.block).unwrap();
        assert_eq!(status, BlockStatus::UtxoValid);
        assert_eq!(consensus.get_virtual_selected_parent().unwrap(), template.block.hash());
        assert_eq!(consensus.get_utxos_by_script_public_keys(&[script(0xd)]).unwrap().len(), 0);
        add(&consensus, &[template.block.hash()], 4, vec![]);
        let found = consensus.get_utxos_by_script_public_keys(&[script(0xd), script(1)]).unwrap();
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn test_red_reward_goes_to_merging_block() {
        let mut config = config();
        config.overrides.ghostdag_k = Some(0);
        let (_tmp, consensus) = open(&config);
        let genesis = consensus.genesis_hash();

        let a = add(&consensus, &[genesis], 1, vec![]).hash();
        let b = add(&consensus, &[genesis], 2, vec![]).hash();
        let template = consensus.build_block_template(&miner(3), vec![]).unwrap();
        assert!(template.coinbase_has_red_reward);

        let merge = add(&consensus, &[a, b], 3, vec![]);
        let merge_data = consensus.get_ghostdag_data(merge.hash()).unwrap();
        let red = merge_data.mergeset_reds[0];
        let blue = merge_data.selected_parent;
        let blue_id = if blue == a { 1 } else { 2 };
        assert_eq!(
            merge.transactions[0].outputs,
            vec![
                reward(&consensus, blue, 0, script(blue_id)),
                reward(&consensus, red, 0, script(3)),
            ]
        );
    }

    #[test]
    fn test_rejections_record_status() {
        let (_tmp, consensus) = open(&config());
        let genesis = consensus.genesis_hash();

        let orphan = build(&consensus, &[genesis], 1);
        let mut orphan_header = orphan.header.clone();
        orphan_header.parents = vec![Hash::from_u64_word(77)];
        orphan_header.finalize();
        let orphan = Block::new(orphan_header, orphan.transactions);
        assert!(matches!(
            consensus.validate_and_insert_block(&orphan),
            Err(ConsensusError::Rule(RuleError::MissingParents(_)))
        ));
        assert_eq!(consensus.get_block_status(orphan.hash()).unwrap(), None);

        // Bits decoding to a zero target
        let mut degenerate = build(&consensus, &[genesis], 1);
        degenerate.header.bits = 0x01000001;
        degenerate.header.finalize();
        let err = consensus.validate_and_insert_block(&degenerate).unwrap_err();
        assert!(matches!(err, ConsensusError::Rule(RuleError::InvalidDifficultyBits(0x01000001))));
        assert_eq!(status(&consensus, degenerate.hash()), Some(BlockStatus::Invalid));
        assert!(matches!(
            consensus.validate_and_insert_block(&degenerate),
            Err(ConsensusError::Rule(RuleError::KnownInvalid(_)))
        ));
        assert_eq!(consensus.get_virtual_selected_parent().unwrap(), genesis);
        assert_eq!(consensus.get_tips().unwrap(), vec![genesis]);
    }

    /// Builds a block over `parents` whose coinbase pays one unit more than it may
    fn overpaying(consensus: &Consensus, parents: &[Hash], id: u8) -> Block {
        let block = build(consensus, parents, id);
        let mut transactions = block.transactions.clone();
        let coinbase = &transactions[0];
        let mut outputs = coinbase.outputs.clone();
        outputs[0].value += 1;
        transactions[0] = Transaction::new(
            coinbase.version,
            vec![],
            outputs,
            coinbase.lock_time,
            coinbase.subnetwork_id.clone(),
            coinbase.gas,
            coinbase.payload.clone(),
        );
        let mut header = block.header.clone();
        header.hash_merkle_root = calc_merkle_root(transactions.iter().map(|tx| tx.id()));
        header.finalize();
        Block::new(header, transactions)
    }

    #[test]
    fn test_bad_coinbase_disqualifies_from_chain() {
        let (_tmp, consensus) = open(&config());
        let genesis = consensus.genesis_hash();

        // Only a block about to become the sink has its coinbase checked
        let disqualified = BlockStatus::DisqualifiedFromChain;
        let x = overpaying(&consensus, &[genesis], 9);
        assert_eq!(consensus.validate_and_insert_block(&x).unwrap(), disqualified);
        assert_eq!(status(&consensus, x.hash()), Some(disqualified));
        assert!(consensus.get_header(x.hash()).is_ok());
        assert_eq!(consensus.get_tips().unwrap(), vec![x.hash()]);
        assert_eq!(consensus.get_virtual_selected_parent().unwrap(), genesis);
        assert_eq!(consensus.get_virtual_parents().unwrap(), vec![genesis]);
        assert!(all_utxos(&consensus).is_empty());
        // Known blocks answer with their status
        assert_eq!(consensus.validate_and_insert_block(&x).unwrap(), disqualified);

        // It can still be merged, and its miner is still paid by the merging block
        let a = add(&consensus, &[genesis], 1, vec![]).hash();
        let b = add(&consensus, &[a], 2, vec![]).hash();
        let w = add(&consensus, &[b, x.hash()], 3, vec![]);
        assert_eq!(status(&consensus, w.hash()), Some(BlockStatus::UtxoValid));
        assert_eq!(consensus.get_virtual_selected_parent().unwrap(), w.hash());
        let w_data = consensus.get_ghostdag_data(w.hash()).unwrap();
        assert_eq!(w_data.selected_parent, b);
        assert!(w_data.mergeset_blues.contains(&x.hash()));
        let x_reward = reward(&consensus, x.hash(), 0, script(9));
        assert!(w.transactions[0].outputs.contains(&x_reward));
        assert_eq!(status(&consensus, x.hash()), Some(disqualified));

        add(&consensus, &[w.hash()], 4, vec![]);
        assert_eq!(paid_to(&all_utxos(&consensus), &script(9)), vec![x_reward.value]);
        // X's own overpaying coinbase never reaches the UTXO set
        assert!(!has_output(&consensus, x.transactions[0].id()));
    }

    #[test]
    fn test_arrival_order_reaches_same_state() {
        let config = config();
        let (_tmp, first) = open(&config);
        let genesis = first.genesis_hash();
        let a = add(&first, &[genesis], 1, vec![]);
        let b = add(&first, &[a.hash()], 2, vec![]);
        // B outweighs X here, so X is never a sink candidate and stays unverified
        let x = overpaying(&first, &[genesis], 9);
        let pending = BlockStatus::UtxoPendingVerification;
        assert_eq!(first.validate_and_insert_block(&x).unwrap(), pending);
        let w = add(&first, &[b.hash(), x.hash()], 3, vec![]);

        let (_second_tmp, second) = open(&config);
        let disqualified = BlockStatus::DisqualifiedFromChain;
        assert_eq!(second.validate_and_insert_block(&x).unwrap(), disqualified);
        for block in [&a, &b, &w] {
            assert_eq!(second.validate_and_insert_block(block).unwrap(), BlockStatus::UtxoValid);
        }

        assert_eq!(second.get_tips().unwrap(), first.get_tips().unwrap());
        assert_eq!(second.get_virtual_selected_parent().unwrap(), w.hash());
        assert_eq!(first.get_virtual_selected_parent().unwrap(), w.hash());
        let daa_score = first.get_virtual_daa_score().unwrap();
        assert_eq!(second.get_virtual_daa_score().unwrap(), daa_score);
        assert_eq!(all_utxos(&second), all_utxos(&first));
        for consensus in [&first, &second] {
            for block in [&a, &b, &x, &w] {
                let status = consensus.get_block_status(block.hash()).unwrap();
                assert!(status.is_some_and(|status| status.has_block_body()), "{status:?}");
            }
        }
    }

    #[test]
    fn test_mergeset_blocks_rewarded_or_red() {
        let mut config = config();
        config.overrides.ghostdag_k = Some(1);
        let (_tmp, consensus) = open(&config);
        let genesis = consensus.genesis_hash();

        let merged: Vec<(Hash, u8)> =
            (1..=3).map(|id| (add(&consensus, &[genesis], id, vec![]).hash(), id)).collect();
        let parents: Vec<Hash> = merged.iter().map(|&(hash, _)| hash).collect();
        let merge = add(&consensus, &parents, 4, vec![]);
        add(&consensus, &[merge.hash()], 5, vec![]);

        let data = consensus.get_ghostdag_data(merge.hash()).unwrap();
        assert_eq!(data.mergeset_blues.len() + data.mergeset_reds.len(), 3);
        assert!(!data.mergeset_reds.is_empty());

        let utxos = all_utxos(&consensus);
        let mut red_reward = 0;
        for &(hash, id) in merged.iter() {
            let subsidy = consensus.calc_block_subsidy(hash).unwrap();
            if data.mergeset_blues.contains(&hash) {
                assert_eq!(paid_to(&utxos, &script(id)), vec![subsidy], "blue block {id}");
            } else {
                assert!(data.mergeset_reds.contains(&hash));
                assert!(paid_to(&utxos, &script(id)).is_empty(), "red block {id}");
                red_reward += subsidy;
            }
        }
        assert_eq!(paid_to(&utxos, &script(4)), vec![red_reward]);
    }

    fn pruning_config() -> Config {
        let mut config = config();
        config.overrides.pruning_depth = Some(5);
        config
    }

    /// Genesis followed by a chain of `len` blocks
    fn pruned_chain(consensus: &Consensus, len: u8) -> Vec<Block> {
        let mut tip = consensus.genesis_hash();
        (1..=len)
            .map(|id| {
                let block = add(consensus, &[tip], id, vec![]);
                tip = block.hash();
                block
            })
            .collect()
    }

    #[test]
    fn test_pruning_point_advances() {
        let (_tmp, consensus) = open(&pruning_config());
        let genesis = consensus.genesis_hash();
        let chain = pruned_chain(&consensus, 8);

        // The pruning point is the highest chain block at least pruning depth below the sink
        let pruning_point = chain[2].hash();
        assert_eq!(consensus.get_pruning_point().unwrap(), pruning_point);
        let area = StagingArea::new();
        let pruning_store = &consensus.storage().pruning;
        assert_eq!(pruning_store.get_pruning_point_info(&area).unwrap().index, 3);
        assert_eq!(pruning_store.get_past_pruning_point(&area, 1).unwrap(), chain[0].hash());

        for hash in [genesis, chain[0].hash(), chain[1].hash()] {
            assert_eq!(status(&consensus, hash), Some(BlockStatus::HeaderOnly));
            assert!(consensus.get_header(hash).is_ok());
            assert!(consensus.get_block(hash).is_err());
        }
        assert_eq!(status(&consensus, pruning_point), Some(BlockStatus::UtxoValid));

        // The pruning-point set holds what the chain accepted up to the pruning point
        let pruning_point_utxos = consensus.get_pruning_point_utxos(None, usize::MAX).unwrap();
        assert_eq!(pruning_point_utxos.len(), 2);
        assert_eq!(paid_to(&pruning_point_utxos, &ScriptPublicKey::default()).len(), 1);
        assert_eq!(paid_to(&pruning_point_utxos, &script(1)).len(), 1);

        let proof = consensus.get_pruning_point_proof().unwrap();
        assert_eq!(proof.pruning_point, pruning_point);
        assert_eq!(proof.chain.len(), 4);
        consensus.validate_pruning_point_proof(&proof).unwrap();

        // A block built on a pruned block is rejected before anything else is checked
        let mut stale = build(&consensus, &[chain[7].hash()], 20);
        stale.header.parents = vec![chain[0].hash()];
        stale.header.finalize();
        let err = consensus.validate_and_insert_block(&stale).unwrap_err();
        assert!(matches!(err, ConsensusError::Rule(RuleError::PruningViolation(_))));
    }

    #[test]
    fn test_history_below_pruning_depth_is_deleted() {
        let (_tmp, consensus) = open(&pruning_config());
        let genesis = consensus.genesis_hash();
        let b1 = add(&consensus, &[genesis], 1, vec![]).hash();
        let b2 = add(&consensus, &[b1], 2, vec![]).hash();
        let side = add(&consensus, &[b1], 3, vec![]).hash();
        let b3 = add(&consensus, &[b2, side], 4, vec![]).hash();
        let b3_data = consensus.get_ghostdag_data(b3).unwrap();
        assert_eq!(b3_data.blue_score, 4);
        let merged = if b3_data.selected_parent == b2 { side } else { b2 };

        // Blue scores 5 to 20, one per block
        let mut chain = Vec::new();
        let mut tip = b3;
        for id in 5..=20 {
            tip = add(&consensus, &[tip], id, vec![]).hash();
            chain.push(tip);
        }
        let pruning_point = chain[10];
        let root = chain[5];
        assert_eq!(consensus.get_ghostdag_data(pruning_point).unwrap().blue_score, 15);
        assert_eq!(consensus.get_pruning_point().unwrap(), pruning_point);
        assert_eq!(history_root(&consensus), root);

        for hash in [genesis, b1, b2, side, b3].into_iter().chain(chain[..5].iter().copied()) {
            assert_eq!(status(&consensus, hash), None);
            assert!(consensus.get_header(hash).is_err());
            assert!(consensus.get_ghostdag_data(hash).is_err());
        }
        assert!(consensus.get_header(merged).is_err());
        for &hash in chain[5..10].iter() {
            assert_eq!(status(&consensus, hash), Some(BlockStatus::HeaderOnly));
            assert!(consensus.get_header(hash).is_ok());
            assert!(consensus.get_block(hash).is_err());
        }
        assert_eq!(status(&consensus, pruning_point), Some(BlockStatus::UtxoValid));

        // The proof stops at the history root instead of running to genesis
        let proof = consensus.get_pruning_point_proof().unwrap();
        assert_eq!(proof.chain.len(), 6);
        assert_eq!(proof.chain[0].header.hash, pruning_point);
        assert_eq!(proof.chain.last().unwrap().header.hash, root);
        consensus.validate_pruning_point_proof(&proof).unwrap();

        let next = add(&consensus, &[tip], 21, vec![]);
        assert_eq!(consensus.get_virtual_selected_parent().unwrap(), next.hash());
        assert_eq!(consensus.get_pruning_point().unwrap(), chain[11]);
        assert_eq!(history_root(&consensus), chain[6]);
        assert_eq!(status(&consensus, root), None);
    }

    #[test]
    fn test_reorg_below_pruning_point_is_refused() {
        let (_tmp, consensus) = open(&pruning_config());
        let genesis = consensus.genesis_hash();
        let side = add(&consensus, &[genesis], 30, vec![]).hash();
        let chain = pruned_chain(&consensus, 8);
        let sink = chain[7].hash();
        let pruning_point = consensus.get_pruning_point().unwrap();
        assert_eq!(pruning_point, chain[2].hash());

        // The side branch only meets the chain at genesis, below the pruning point
        let err = consensus.build_block_with_parents(&[side], &miner(31), vec![]).unwrap_err();
        assert!(matches!(
            err,
            ConsensusError::Rule(RuleError::ReorgBelowPruningPoint(from, to, at))
                if from == sink && to == side && at == pruning_point
        ));
        assert_eq!(consensus.get_virtual_selected_parent().unwrap(), sink);
    }

    #[test]
    fn test_pruning_point_utxo_import() {
        let config = pruning_config();
        let (_source_tmp, source) = open(&config);
        let chain = pruned_chain(&source, 8);
        let pruning_point = source.get_pruning_point().unwrap();
        assert_eq!(pruning_point, chain[2].hash());

        let (_tmp, target) = open(&config);
        let proof = source.get_pruning_point_proof().unwrap();
        target.validate_pruning_point_proof(&proof).unwrap();

        assert!(matches!(
            target.append_imported_pruning_point_utxos(&vec![]),
            Err(ConsensusError::Rule(RuleError::NoUtxoImportInProgress))
        ));
        let ghostdag = source.get_ghostdag_data(pruning_point).unwrap();
        let trusted =
            TrustedBlock::new(source.get_block(pruning_point).unwrap(), ghostdag.as_ref().clone());
        let pending = BlockStatus::UtxoPendingVerification;
        assert_eq!(target.import_trusted_block(&trusted).unwrap(), pending);

        target.begin_pruning_point_utxo_import().unwrap();
        // Nothing touches the UTXO sets until the import is committed
        assert!(matches!(
            target.validate_and_insert_block(&chain[3]),
            Err(ConsensusError::Rule(RuleError::UtxoImportInProgress))
        ));
        assert_eq!(status(&target, chain[3].hash()), None);
        assert!(matches!(
            target.get_virtual_utxos(None, 10),
            Err(ConsensusError::Rule(RuleError::UtxoImportInProgress))
        ));
        assert!(matches!(
            target.build_block_template(&miner(40), vec![]),
            Err(ConsensusError::Rule(RuleError::UtxoImportInProgress))
        ));
        let mut after = None;
        loop {
            let chunk = source.get_pruning_point_utxos(after, 1).unwrap();
            let Some(&(last, _)) = chunk.last() else { break };
            target.append_imported_pruning_point_utxos(&chunk).unwrap();
            after = Some(last);
        }
        assert!(matches!(
            target.commit_pruning_point_utxo_import(Hash::from_u64_word(5)),
            Err(ConsensusError::Rule(RuleError::UnknownPruningPoint(_)))
        ));
        target.commit_pruning_point_utxo_import(pruning_point).unwrap();

        assert_eq!(target.get_pruning_point().unwrap(), pruning_point);
        assert_eq!(target.get_virtual_selected_parent().unwrap(), pruning_point);
        assert_eq!(status(&target, pruning_point), Some(BlockStatus::UtxoValid));
        assert_eq!(history_root(&target), pruning_point);
        let imported = source.get_pruning_point_utxos(None, usize::MAX).unwrap();
        assert_eq!(all_utxos(&target), imported);
        assert!(matches!(
            target.commit_pruning_point_utxo_import(pruning_point),
            Err(ConsensusError::Rule(RuleError::NoUtxoImportInProgress))
        ));

        // Blocks above the pruning point replay to the same virtual state
        for block in chain.iter().skip(3) {
            assert_eq!(target.validate_and_insert_block(block).unwrap(), BlockStatus::UtxoValid);
        }
        let sink = source.get_virtual_selected_parent().unwrap();
        assert_eq!(target.get_virtual_selected_parent().unwrap(), sink);
        assert_eq!(all_utxos(&target), all_utxos(&source));
        assert_eq!(target.get_pruning_point().unwrap(), pruning_point);
    }
}
