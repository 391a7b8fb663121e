use crate::protocol::{Message, ParseError, PayloadItem, PayloadSize, RequestHeader};
use bytes::Bytes;
use futures::{SinkExt, Stream, StreamExt, channel::mpsc};
use http_body::{Body, Frame, SizeHint};
use std::pin::Pin;
use std::task::{Context, Poll};
use tracing::{error, info};

type DataResult = Result<PayloadItem, ParseError>;

/// Creates the two halves of a request body bound to `payload_stream`.
///
/// An empty payload yields a body that is finished from the start; the
/// sender still consumes the trailing [`PayloadItem::Eof`] in
/// [`BodySender::skip_body`].
pub fn body_channel<S>(payload_stream: &mut S, payload_size: PayloadSize) -> (ReqBody, BodySender<'_, S>)
where
    S: Stream<Item = Result<Message<(RequestHeader, PayloadSize)>, ParseError>> + Unpin,
{
    let (signal_sender, signal_receiver) = mpsc::channel(1);
    let (data_sender, data_receiver) = mpsc::channel(8);

    let body = ReqBody {
        signal_sender,
        data_receiver,
        payload_size,
        in_flight: false,
        eof: payload_size.is_empty(),
    };
    let sender = BodySender { payload_stream, signal_receiver, data_sender, eof: false };

    (body, sender)
}

/// The connection side of a request body.
///
/// [`send_body`](BodySender::send_body) answers data requests from the
/// [`ReqBody`] while the handler runs; [`skip_body`](BodySender::skip_body)
/// discards whatever is left afterwards.
#[derive(Debug)]
pub struct BodySender<'conn, S> {
    payload_stream: &'conn mut S,
    signal_receiver: mpsc::Receiver<()>,
    data_sender: mpsc::Sender<DataResult>,
    eof: bool,
}

impl<S> BodySender<'_, S>
where
    S: Stream<Item = Result<Message<(RequestHeader, PayloadSize)>, ParseError>> + Unpin,
{
    /// Serves data requests until the payload ends or the body is dropped.
    pub async fn send_body(&mut self) -> Result<(), ParseError> {
        while !self.eof {
            if self.signal_receiver.next().await.is_none() {
                // the handler dropped its body
                return Ok(());
            }

            match self.read_item().await {
                Ok(payload_item) => {
                    self.eof = payload_item.is_eof();
                    if self.data_sender.send(Ok(payload_item)).await.is_err() {
                        return Ok(());
                    }
                }
                Err(e) => {
                    error!(cause = %e, "failed to read request body");
                    let _ = self.data_sender.send(Err(ParseError::invalid_body(&e))).await;
                    return Err(e);
                }
            }
        }

        Ok(())
    }

    /// Reads and discards the rest of the payload.
    pub async fn skip_body(&mut self) -> Result<(), ParseError> {
        let mut size: usize = 0;
        while !self.eof {
            match self.read_item().await? {
                PayloadItem::Chunk(bytes) => size += bytes.len(),
                PayloadItem::Eof => self.eof = true,
            }
        }

        if size > 0 {
            info!(size = size, "skip request body");
        }
        Ok(())
    }

    async fn read_item(&mut self) -> Result<PayloadItem, ParseError> {
        match self.payload_stream.next().await {
            Some(Ok(Message::Payload(payload_item))) => Ok(payload_item),
            Some(Ok(Message::Header(_))) => Err(ParseError::invalid_body("received header while reading body")),
            Some(Err(e)) => Err(e),
            None => Err(ParseError::IncompleteBody),
        }
    }
}

/// The handler side of a request body, an [`http_body::Body`] of [`Bytes`].
#[derive(Debug)]
pub struct ReqBody {
    signal_sender: mpsc::Sender<()>,
    data_receiver: mpsc::Receiver<DataResult>,
    payload_size: PayloadSize,
    in_flight: bool,
    eof: bool,
}

impl Body for ReqBody {
    type Data = Bytes;
    type Error = ParseError;

    fn poll_frame(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();

        if this.eof {
            return Poll::Ready(None);
        }

        // only one outstanding request at a time
        if !this.in_flight {
            match this.signal_sender.poll_ready(cx) {
                Poll::Ready(Ok(())) => {
                    if let Err(e) = this.signal_sender.start_send(()) {
                        return Poll::Ready(Some(Err(ParseError::invalid_body(e))));
                    }
                    this.in_flight = true;
                }
                Poll::Ready(Err(e)) => return Poll::Ready(Some(Err(ParseError::invalid_body(e)))),
                Poll::Pending => return Poll::Pending,
            }
        }

        match this.data_receiver.poll_next_unpin(cx) {
            Poll::Ready(Some(Ok(PayloadItem::Chunk(bytes)))) => {
                this.in_flight = false;
                Poll::Ready(Some(Ok(Frame::data(bytes))))
            }
            Poll::Ready(Some(Ok(PayloadItem::Eof))) => {
                this.in_flight = false;
                this.eof = true;
                Poll::Ready(None)
            }
            Poll::Ready(Some(Err(e))) => {
                this.in_flight = false;
                this.eof = true;
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(None) => {
                this.eof = true;
                Poll::Ready(Some(Err(ParseError::invalid_body("connection stopped sending the body"))))
            }
            Poll::Pending => Poll::Pending,
        }
    }

    fn is_end_stream(&self) -> bool {
        self.eof
    }

    fn size_hint(&self) -> SizeHint {
        match self.payload_size {
            PayloadSize::Length(length) => SizeHint::with_exact(length),
            PayloadSize::Chunked => SizeHint::new(),
            PayloadSize::Empty => SizeHint::with_exact(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use futures::task::noop_waker_ref;
    use http::Request;
    use http_body_util::BodyExt;

    type Item = Result<Message<(RequestHeader, PayloadSize)>, ParseError>;

    fn payload(items: Vec<PayloadItem>) -> Vec<Item> {
        items.into_iter().map(|item| Ok(Message::Payload(item))).collect()
    }

    #[tokio::test]
    async fn body_is_fed_on_demand() {
        let mut messages = stream::iter(payload(vec![
            PayloadItem::Chunk(Bytes::from_static(b"hello ")),
            PayloadItem::Chunk(Bytes::from_static(b"world")),
            PayloadItem::Eof,
        ]));

        let (body, mut sender) = body_channel(&mut messages, PayloadSize::new_length(11));
        assert_eq!(body.size_hint().exact(), Some(11));

        let (collected, sent) = tokio::join!(body.collect(), sender.send_body());

        assert!(sent.is_ok());
        assert_eq!(collected.unwrap().to_bytes(), Bytes::from_static(b"hello world"));
    }

    #[tokio::test]
    async fn unread_body_is_skipped() {
        let mut messages = stream::iter(payload(vec![
            PayloadItem::Chunk(Bytes::from_static(b"ignored")),
            PayloadItem::Eof,
        ]));

        let (body, mut sender) = body_channel(&mut messages, PayloadSize::new_chunked());
        drop(body);

        sender.send_body().await.unwrap();
        sender.skip_body().await.unwrap();
        assert!(messages.next().await.is_none());
    }

    #[tokio::test]
    async fn empty_body_is_finished() {
        let mut messages = stream::iter(payload(vec![PayloadItem::Eof]));

        let (mut body, mut sender) = body_channel(&mut messages, PayloadSize::new_empty());
        assert!(body.is_end_stream());
        assert!(body.frame().await.is_none());

        sender.skip_body().await.unwrap();
    }

    #[tokio::test]
    async fn truncated_stream_fails() {
        let mut messages = stream::iter(payload(vec![PayloadItem::Chunk(Bytes::from_static(b"par"))]));

        let (body, mut sender) = body_channel(&mut messages, PayloadSize::new_length(10));

        let (collected, sent) = tokio::join!(body.collect(), sender.send_body());

        assert!(matches!(sent, Err(ParseError::IncompleteBody)));
        assert!(collected.is_err());
    }

    #[tokio::test]
    async fn header_in_body_phase_fails() {
        let header = RequestHeader::from(Request::builder().uri("/").body(()).unwrap());
        let mut messages = stream::iter(vec![Ok(Message::Header((header, PayloadSize::new_empty())))]);

        let (_body, mut sender) = body_channel(&mut messages, PayloadSize::new_chunked());

        assert!(matches!(sender.skip_body().await, Err(ParseError::InvalidBody { .. })));
    }

    #[tokio::test]
    async fn only_one_request_in_flight() {
        let mut messages = stream::iter(Vec::<Item>::new());
        let (mut body, mut sender) = body_channel(&mut messages, PayloadSize::new_chunked());

        let mut cx = Context::from_waker(noop_waker_ref());

        assert!(Pin::new(&mut body).poll_frame(&mut cx).is_pending());
        assert!(sender.signal_receiver.next().await.is_some());

        assert!(Pin::new(&mut body).poll_frame(&mut cx).is_pending());
        assert!(sender.signal_receiver.try_next().is_err());

        sender.data_sender.try_send(Ok(PayloadItem::Chunk(Bytes::from_static(b"hello")))).unwrap();
        match Pin::new(&mut body).poll_frame(&mut cx) {
            Poll::Ready(Some(Ok(frame))) => assert_eq!(frame.into_data().unwrap(), Bytes::from_static(b"hello")),
            other => panic!("unexpected poll result: {other:?}"),
        }
    }
}
