//! # Replay Attacks
//!
//! Re-submitting an already accepted voucher or message must never pay out
//! twice.

#[cfg(test)]
mod tests {
    use crate::fixtures::{Chain, BROKER};
    use pb_01_actor_state::Address;
    use pb_02_payment_broker::{
        BrokerCall, BrokerError, CallResult, CreateParams, DispatchError, Message,
        PaymentBrokerApi,
    };

    const OTHER_BROKER: Address = Address::new([0xB1; 20]);

    #[test]
    fn test_voucher_replay_is_stale() {
        let chain = Chain::new();
        let payer = chain.participant(1, 1000);
        let target = chain.participant(2, 0);
        let id = chain.create(&payer, &target.address, 100, 1000).unwrap();

        let voucher = payer.voucher(id, 500);
        chain.redeem(&target.address, voucher.clone()).unwrap();
        for _ in 0..3 {
            assert!(matches!(
                chain.redeem(&target.address, voucher.clone()),
                Err(DispatchError::Broker(BrokerError::StaleVoucher { .. }))
            ));
        }
        assert_eq!(chain.balance(&target.address), 500);
        assert!(chain.escrow_balanced());
    }

    #[test]
    fn test_message_replay_fails_nonce_check() {
        let chain = Chain::new();
        let payer = chain.participant(1, 1000);
        let target = chain.participant(2, 0);
        let id = chain.create(&payer, &target.address, 100, 1000).unwrap();

        let message = Message {
            from: target.address,
            to: BROKER,
            nonce: 0,
            call: BrokerCall::Redeem(payer.voucher(id, 200)),
        };
        chain.dispatcher.apply(message.clone()).unwrap();

        assert_eq!(
            chain.dispatcher.apply(message).unwrap_err(),
            DispatchError::InvalidNonce {
                expected: 1,
                actual: 0
            }
        );
        assert_eq!(chain.balance(&target.address), 200);
    }

    #[test]
    fn test_voucher_bound_to_issuing_broker() {
        let chain = Chain::new();
        chain.dispatcher.install_broker(OTHER_BROKER).unwrap();
        let payer = chain.participant(1, 1000);
        let target = chain.participant(2, 0);

        // Same payer, target and channel id on both brokers
        let id = chain.create(&payer, &target.address, 100, 400).unwrap();
        let receipt = chain
            .dispatcher
            .apply(Message {
                from: payer.address,
                to: OTHER_BROKER,
                nonce: chain.nonce(&payer.address),
                call: BrokerCall::Create(CreateParams {
                    target: target.address,
                    eol: 100,
                    amount: 400,
                    conditions: None,
                }),
            })
            .unwrap();
        assert_eq!(receipt.result, CallResult::ChannelCreated(id));

        let voucher = payer.voucher(id, 300);
        chain.redeem(&target.address, voucher.clone()).unwrap();

        let replay = Message {
            from: target.address,
            to: OTHER_BROKER,
            nonce: chain.nonce(&target.address),
            call: BrokerCall::Redeem(voucher),
        };
        assert!(matches!(
            chain.dispatcher.apply(replay).unwrap_err(),
            DispatchError::Broker(BrokerError::InvalidVoucher(_))
        ));
        assert_eq!(chain.balance(&target.address), 300);
        assert_eq!(chain.balance(&OTHER_BROKER), 400);

        // A voucher issued on the second broker redeems there
        let own = Message {
            from: target.address,
            to: OTHER_BROKER,
            nonce: chain.nonce(&target.address),
            call: BrokerCall::Redeem(payer.voucher_on(OTHER_BROKER, id, 300)),
        };
        chain.dispatcher.apply(own).unwrap();
        assert_eq!(chain.balance(&target.address), 600);
        assert_eq!(chain.balance(&OTHER_BROKER), 100);
    }

    #[test]
    fn test_skipped_nonce_rejected() {
        let chain = Chain::new();
        let payer = chain.participant(1, 1000);
        let target = chain.participant(2, 0);

        let err = chain
            .dispatcher
            .transfer(payer.address, target.address, 5, 10)
            .unwrap_err();
        assert_eq!(
            err,
            DispatchError::InvalidNonce {
                expected: 0,
                actual: 5
            }
        );
        assert_eq!(chain.nonce(&payer.address), 0);
    }

    #[test]
    fn test_voucher_replayed_on_reopened_slot() {
        let chain = Chain::new();
        let payer = chain.participant(1, 1000);
        let target = chain.participant(2, 0);

        let old = chain.create(&payer, &target.address, 100, 300).unwrap();
        let voucher = payer.voucher(old, 300);
        chain
            .close(&payer.address, &payer.address, old, Some(voucher.clone()))
            .unwrap();

        // A fresh channel never inherits the closed channel's id
        let fresh = chain.create(&payer, &target.address, 100, 300).unwrap();
        assert_ne!(old, fresh);
        assert!(matches!(
            chain.redeem(&target.address, voucher),
            Err(DispatchError::Broker(BrokerError::InvalidVoucher(_)))
        ));
        assert_eq!(chain.balance(&target.address), 300);
    }
}
