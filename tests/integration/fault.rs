use crate::*;

use ring_core::wire::TAG_TOKEN;

/// Drop every token whose origin byte is `origin`.
fn drop_tokens_from(origin: NodeId) -> DatagramFilter {
    Arc::new(move |d: &[u8]| !(d.len() == 8 && d[0] == TAG_TOKEN && d[1] == origin))
}

/// Node 2's forwards are lost. The ring goes silent and the origin puts a
/// fresh token out with a higher sequence after the timeout.
#[tokio::test]
async fn test_origin_regenerates_lost_token() -> Result<()> {
    let ring = start_ring(&[1, 2, 3], fast_timing(), |_| Vec::new(), Some(drop_tokens_from(2))).await?;

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while sent_token_seqs(&ring.node(1).log).len() < 2 {
        if tokio::time::Instant::now() >= deadline {
            bail!("origin never regenerated the token");
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    let sent = sent_token_seqs(&ring.node(1).log);
    assert_eq!(sent[0], (1, 2));
    assert_eq!(sent[1], (2, 2));

    // Node 2 accepted both generations: same origin, higher sequence.
    let at_2 = wait_for_event(&ring.node(2).log, Duration::from_secs(1), |k| {
        matches!(k, EventKind::TokenReceived { seq: 2, from: 1 })
    })
    .await?;
    assert_eq!(at_2, EventKind::TokenReceived { seq: 2, from: 1 });

    // Node 3 never got a token addressed to it.
    assert!(ring
        .node(3)
        .log
        .filter(|k| matches!(k, EventKind::TokenReceived { .. }))
        .is_empty());
    assert!(ring.relay.dropped() > 0);
    Ok(())
}

/// Regeneration waits for the timeout: no second token while the ring is
/// merely slow.
#[tokio::test]
async fn test_no_regeneration_before_timeout() -> Result<()> {
    let mut timing = fast_timing();
    timing.token_timeout_ms = 1500;
    let ring = start_ring(&[1, 2, 3], timing, |_| Vec::new(), Some(drop_tokens_from(2))).await?;

    wait_for_event(&ring.node(1).log, Duration::from_secs(2), |k| {
        matches!(k, EventKind::TokenSent { .. })
    })
    .await?;
    tokio::time::sleep(Duration::from_millis(700)).await;
    assert_eq!(sent_token_seqs(&ring.node(1).log).len(), 1);
    Ok(())
}

/// Garbage on the medium is dropped and the ring keeps turning.
#[tokio::test]
async fn test_garbage_datagrams_are_ignored() -> Result<()> {
    let ring = start_ring(&[1, 2, 3], fast_timing(), |_| Vec::new(), None).await?;

    let noise = UdpSocket::bind("127.0.0.1:0").await?;
    for datagram in [&[0x42u8; 8][..], &[0u8; 3][..], &[0x10u8; 12][..]] {
        noise.send_to(datagram, ring.relay.addr).await?;
    }

    wait_for_event(&ring.node(1).log, Duration::from_secs(3), |k| {
        matches!(k, EventKind::TokenReceived { from: 3, .. })
    })
    .await?;
    assert!(ring.all_running());
    Ok(())
}
