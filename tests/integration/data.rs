use crate::*;

fn greetings(id: NodeId) -> Vec<HoldSend> {
    if id == 1 {
        vec![HoldSend {
            to: Some(2),
            data: "Hello Node2".into(),
        }]
    } else {
        Vec::new()
    }
}

/// Node 1 sends "Hello Node2" while holding; node 2 reassembles exactly
/// those 11 bytes from one header, two chunks and an end marker.
#[tokio::test]
async fn test_hello_node2_is_delivered() -> Result<()> {
    let ring = start_ring(&[1, 2, 3], fast_timing(), greetings, None).await?;

    let received = wait_for_event(&ring.node(2).log, Duration::from_secs(3), |k| {
        matches!(k, EventKind::DataReceived { .. })
    })
    .await?;

    match &received {
        EventKind::DataReceived { from, to, .. } => {
            assert_eq!(*from, 1);
            assert_eq!(*to, 2);
        }
        other => panic!("unexpected event {other:?}"),
    }
    assert_eq!(received.payload().unwrap(), b"Hello Node2");

    let sent = wait_for_event(&ring.node(1).log, Duration::from_secs(1), |k| {
        matches!(k, EventKind::DataSent { .. })
    })
    .await?;
    assert_eq!(sent.payload().unwrap(), b"Hello Node2");
    Ok(())
}

/// The relay fans data out to everyone, so bystanders reassemble it too,
/// but the sender never reassembles its own transfer.
#[tokio::test]
async fn test_sender_never_reassembles_own_data() -> Result<()> {
    let ring = start_ring(&[1, 2, 3], fast_timing(), greetings, None).await?;

    let at_3 = wait_for_event(&ring.node(3).log, Duration::from_secs(3), |k| {
        matches!(k, EventKind::DataReceived { .. })
    })
    .await?;
    assert_eq!(at_3.payload().unwrap(), b"Hello Node2");

    // Give node 1 time to see its own echo.
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(ring
        .node(1)
        .log
        .filter(|k| matches!(k, EventKind::DataReceived { .. }))
        .is_empty());
    Ok(())
}

/// A payload at the 255-byte limit spans 37 chunks and survives intact.
#[tokio::test]
async fn test_max_length_payload_round_trips() -> Result<()> {
    let payload: String = (0..255).map(|i| (b'a' + (i % 26) as u8) as char).collect();
    let expected = payload.clone().into_bytes();
    let ring = start_ring(
        &[1, 2],
        fast_timing(),
        move |id| {
            if id == 2 {
                vec![HoldSend {
                    to: Some(1),
                    data: payload.clone(),
                }]
            } else {
                Vec::new()
            }
        },
        None,
    )
    .await?;

    let received = wait_for_event(&ring.node(1).log, Duration::from_secs(3), |k| {
        matches!(k, EventKind::DataReceived { .. })
    })
    .await?;
    assert_eq!(received.payload().unwrap(), expected);
    Ok(())
}

/// Queued broadcasts go to every other member exactly once.
#[tokio::test]
async fn test_queued_broadcast_reaches_every_peer() -> Result<()> {
    let ring = start_ring(&[1, 2, 3], fast_timing(), |_| Vec::new(), None).await?;
    ring.node(2).node.queue_broadcast(&b"to all"[..])?;

    for id in [1, 3] {
        let received = wait_for_event(&ring.node(id).log, Duration::from_secs(3), |k| {
            matches!(k, EventKind::DataReceived { from: 2, .. })
        })
        .await?;
        assert_eq!(received.payload().unwrap(), b"to all");
    }

    tokio::time::sleep(Duration::from_millis(300)).await;
    let sent = ring
        .node(2)
        .log
        .filter(|k| matches!(k, EventKind::DataSent { .. }));
    assert_eq!(sent.len(), 2, "one send per peer, once: {sent:?}");
    Ok(())
}
