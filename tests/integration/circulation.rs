use crate::*;

/// Ring {1,2,3}: 1 creates the token, 2 and 3 forward it with their own
/// sequence numbers, and it arrives back at 1 from 3.
#[tokio::test]
async fn test_token_makes_full_revolution() -> Result<()> {
    let ring = start_ring(&[1, 2, 3], fast_timing(), |_| Vec::new(), None).await?;
    let wait = Duration::from_secs(3);

    let at_2 = wait_for_event(&ring.node(2).log, wait, |k| {
        matches!(k, EventKind::TokenReceived { .. })
    })
    .await?;
    assert_eq!(at_2, EventKind::TokenReceived { seq: 1, from: 1 });

    let at_3 = wait_for_event(&ring.node(3).log, wait, |k| {
        matches!(k, EventKind::TokenReceived { .. })
    })
    .await?;
    assert_eq!(at_3, EventKind::TokenReceived { seq: 1, from: 2 });

    let at_1 = wait_for_event(&ring.node(1).log, wait, |k| {
        matches!(k, EventKind::TokenReceived { .. })
    })
    .await?;
    assert_eq!(at_1, EventKind::TokenReceived { seq: 1, from: 3 });

    assert_eq!(sent_token_seqs(&ring.node(1).log)[0], (1, 2));
    assert_eq!(sent_token_seqs(&ring.node(2).log)[0], (1, 3));
    assert_eq!(sent_token_seqs(&ring.node(3).log)[0], (1, 1));
    assert!(ring.all_running());
    Ok(())
}

/// Once circulating, every node's sent sequence keeps strictly increasing
/// and always targets its successor.
#[tokio::test]
async fn test_sequences_increase_while_circulating() -> Result<()> {
    let ring = start_ring(&[1, 2, 3], fast_timing(), |_| Vec::new(), None).await?;

    // Wait for node 3 to have forwarded at least three times.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while sent_token_seqs(&ring.node(3).log).len() < 3 {
        if tokio::time::Instant::now() >= deadline {
            bail!("token did not circulate three times");
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    for (id, successor) in [(1, 2), (2, 3), (3, 1)] {
        let sent = sent_token_seqs(&ring.node(id).log);
        assert!(
            sent.windows(2).all(|w| w[0].0 < w[1].0),
            "node {id} sequences not increasing: {sent:?}"
        );
        assert!(
            sent.iter().all(|(_, to)| *to == successor),
            "node {id} sent to someone other than {successor}: {sent:?}"
        );
    }
    assert!(ring.relay.forwarded() > 0);
    Ok(())
}
