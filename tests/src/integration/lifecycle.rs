//! # Channel Lifecycle
//!
//! Close, extend, listing, the off-chain voucher exchange and the raw
//! message boundary.

#[cfg(test)]
mod tests {
    use crate::fixtures::{Chain, BROKER};
    use pb_01_actor_state::ContentStore;
    use pb_02_payment_broker::{
        BrokerCall, BrokerConfig, BrokerError, ChannelId, Condition, CreateParams, DispatchError,
        PaymentBrokerApi, ReclaimParams, Voucher,
    };
    use proptest::prelude::*;

    #[test]
    fn test_payer_closes_early_with_final_voucher() {
        let chain = Chain::new();
        let payer = chain.participant(1, 1000);
        let target = chain.participant(2, 0);
        let id = chain.create(&payer, &target.address, 100, 800).unwrap();
        chain.redeem(&target.address, payer.voucher(id, 100)).unwrap();

        chain.clock.set(20);
        chain
            .close(&payer.address, &payer.address, id, Some(payer.voucher(id, 300)))
            .unwrap();

        assert_eq!(chain.balance(&target.address), 300);
        assert_eq!(chain.balance(&payer.address), 700);
        assert_eq!(chain.balance(&BROKER), 0);
        assert!(chain.dispatcher.ls(&BROKER, &payer.address).unwrap().is_empty());
    }

    #[test]
    fn test_target_closes_with_voucher_only() {
        let chain = Chain::new();
        let payer = chain.participant(1, 1000);
        let target = chain.participant(2, 0);
        let id = chain.create(&payer, &target.address, 100, 1000).unwrap();

        assert_eq!(
            chain.close(&target.address, &payer.address, id, None).unwrap_err(),
            DispatchError::Broker(BrokerError::Unauthorized(target.address))
        );

        chain
            .close(&target.address, &payer.address, id, Some(payer.voucher(id, 450)))
            .unwrap();
        assert_eq!(chain.balance(&target.address), 450);
        assert_eq!(chain.balance(&payer.address), 550);
    }

    #[test]
    fn test_failed_extend_leaves_channel_untouched() {
        let chain = Chain::new();
        let payer = chain.participant(1, 1000);
        let target = chain.participant(2, 0);
        let id = chain.create(&payer, &target.address, 100, 900).unwrap();
        let head = chain.account(&BROKER).head;

        assert!(matches!(
            chain.extend(&payer.address, id, 200, 101),
            Err(DispatchError::Broker(BrokerError::InsufficientFunds { .. }))
        ));
        assert!(matches!(
            chain.extend(&payer.address, id, 100, 1),
            Err(DispatchError::Broker(BrokerError::InvalidExpiry { .. }))
        ));

        let channel = chain.table().get(&payer.address, id).cloned().unwrap();
        assert_eq!((channel.amount, channel.eol), (900, 100));
        assert_eq!(chain.balance(&payer.address), 100);
        assert_eq!(chain.account(&BROKER).head, head);

        chain.extend(&payer.address, id, 200, 100).unwrap();
        let channel = chain.table().get(&payer.address, id).cloned().unwrap();
        assert_eq!((channel.amount, channel.eol), (1000, 200));
        assert!(chain.escrow_balanced());
    }

    #[test]
    fn test_extended_channel_reclaims_later() {
        let chain = Chain::new();
        let payer = chain.participant(1, 1000);
        let target = chain.participant(2, 0);
        let id = chain.create(&payer, &target.address, 100, 500).unwrap();
        chain.extend(&payer.address, id, 300, 0).unwrap();

        chain.clock.set(150);
        assert!(matches!(
            chain.reclaim(&payer.address, id),
            Err(DispatchError::Broker(BrokerError::NotYetExpired { eol: 300, .. }))
        ));
        chain.clock.set(300);
        chain.reclaim(&payer.address, id).unwrap();
        assert_eq!(chain.balance(&payer.address), 1000);
    }

    #[test]
    fn test_ids_not_reused_after_close() {
        let chain = Chain::new();
        let payer = chain.participant(1, 1000);
        let target = chain.participant(2, 0);

        let first = chain.create(&payer, &target.address, 100, 100).unwrap();
        chain.close(&payer.address, &payer.address, first, None).unwrap();
        let second = chain.create(&payer, &target.address, 100, 100).unwrap();

        assert_ne!(first, second);
        let listed = chain.dispatcher.ls(&BROKER, &payer.address).unwrap();
        assert_eq!(listed.keys().copied().collect::<Vec<_>>(), vec![second]);
    }

    #[test]
    fn test_channels_are_scoped_per_payer() {
        let chain = Chain::new();
        let alice = chain.participant(1, 1000);
        let bob = chain.participant(2, 1000);
        let target = chain.participant(3, 0);

        let a = chain.create(&alice, &target.address, 100, 300).unwrap();
        let b = chain.create(&bob, &target.address, 100, 200).unwrap();
        assert_eq!(a, b);

        chain.redeem(&target.address, alice.voucher(a, 300)).unwrap();
        chain.redeem(&target.address, bob.voucher(b, 50)).unwrap();

        assert_eq!(chain.balance(&target.address), 350);
        assert_eq!(chain.table().get(&bob.address, b).unwrap().amount_redeemed, 50);
        assert!(chain.escrow_balanced());
    }

    #[test]
    fn test_voucher_exchange_through_hex() {
        let chain = Chain::new();
        let payer = chain.participant(1, 1000);
        let target = chain.participant(2, 0);
        let id = chain.create(&payer, &target.address, 100, 1000).unwrap();

        // Payer drafts, signs and ships a string; target decodes and redeems raw
        let body = chain.dispatcher.voucher(&BROKER, payer.address, id, 640).unwrap();
        let text = body.sign(&payer.key).unwrap().to_hex().unwrap();

        let limit = chain.dispatcher.config().max_voucher_bytes;
        let voucher = Voucher::from_hex(&text, limit).unwrap();
        chain
            .dispatcher
            .apply_raw(
                target.address,
                BROKER,
                chain.nonce(&target.address),
                "redeem",
                &voucher.encode().unwrap(),
            )
            .unwrap();
        assert_eq!(chain.balance(&target.address), 640);
    }

    #[test]
    fn test_raw_create_and_reclaim() {
        let chain = Chain::new();
        let payer = chain.participant(1, 1000);
        let target = chain.participant(2, 0);

        let create = BrokerCall::Create(CreateParams {
            target: target.address,
            eol: 5,
            amount: 250,
            conditions: None,
        });
        chain
            .dispatcher
            .apply_raw(payer.address, BROKER, 0, "createChannel", &create.encode_params().unwrap())
            .unwrap();

        chain.clock.set(5);
        let reclaim = BrokerCall::Reclaim(ReclaimParams {
            channel_id: ChannelId::new(0),
        });
        chain
            .dispatcher
            .apply_raw(payer.address, BROKER, 1, "reclaim", &reclaim.encode_params().unwrap())
            .unwrap();
        assert_eq!(chain.balance(&payer.address), 1000);
        assert_eq!(chain.nonce(&payer.address), 2);
    }

    #[test]
    fn test_conditional_channel() {
        let chain = Chain::new();
        let payer = chain.participant(1, 1000);
        let target = chain.participant(2, 0);
        let condition = Condition::new(payer.address, "deliveryConfirmed", vec![7]);

        let receipt = chain
            .send(
                &payer.address,
                BrokerCall::Create(CreateParams {
                    target: target.address,
                    eol: 100,
                    amount: 500,
                    conditions: Some(condition.clone()),
                }),
            )
            .unwrap();
        let id = match receipt.result {
            pb_02_payment_broker::CallResult::ChannelCreated(id) => id,
            other => panic!("unexpected result {other:?}"),
        };

        assert!(matches!(
            chain.redeem(&target.address, payer.voucher(id, 100)),
            Err(DispatchError::Broker(BrokerError::InvalidVoucher(_)))
        ));
        chain.conditions.allow(condition);
        chain.redeem(&target.address, payer.voucher(id, 100)).unwrap();
        assert_eq!(chain.balance(&target.address), 100);
    }

    #[test]
    fn test_channel_limit_per_payer() {
        let chain = Chain::with_config(BrokerConfig {
            max_channels_per_payer: 2,
            ..Default::default()
        });
        let payer = chain.participant(1, 1000);
        let target = chain.participant(2, 0);

        chain.create(&payer, &target.address, 100, 10).unwrap();
        chain.create(&payer, &target.address, 100, 10).unwrap();
        assert!(matches!(
            chain.create(&payer, &target.address, 100, 10),
            Err(DispatchError::Broker(BrokerError::TooManyChannels { limit: 2, .. }))
        ));
    }

    #[test]
    fn test_old_heads_stay_readable() {
        let chain = Chain::new();
        let payer = chain.participant(1, 1000);
        let target = chain.participant(2, 0);

        let before = chain.account(&BROKER).head.unwrap();
        chain.create(&payer, &target.address, 100, 10).unwrap();
        let after = chain.account(&BROKER).head.unwrap();

        assert_ne!(before, after);
        assert!(chain.content.get(&before).unwrap().is_some());
        assert!(chain.content.get(&after).unwrap().is_some());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        /// Escrow stays balanced and value is conserved whatever mix of
        /// messages the participants send.
        #[test]
        fn prop_committed_state_stays_balanced(
            ops in proptest::collection::vec((0u8..5, 0u64..3, 1u128..400, 0u64..30), 1..25)
        ) {
            let chain = Chain::new();
            let payer = chain.participant(1, 3000);
            let target = chain.participant(2, 0);

            for (op, slot, amount, blocks) in ops {
                let height = chain.clock.advance(blocks);
                let id = ChannelId::new(slot);
                let _ = match op {
                    0 => chain.create(&payer, &target.address, height + 25, amount).map(|_| ()),
                    1 => chain.extend(&payer.address, id, height + 50, amount).map(|_| ()),
                    2 => chain.redeem(&target.address, payer.voucher(id, amount)).map(|_| ()),
                    3 => chain.reclaim(&payer.address, id).map(|_| ()),
                    _ => chain
                        .close(&payer.address, &payer.address, id, Some(payer.voucher(id, amount)))
                        .map(|_| ()),
                };

                prop_assert!(chain.escrow_balanced());
                let total = chain.balance(&payer.address)
                    + chain.balance(&target.address)
                    + chain.balance(&BROKER);
                prop_assert_eq!(total, 3000);
            }
        }
    }
}
