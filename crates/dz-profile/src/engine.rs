use std::collections::{HashMap, HashSet, VecDeque};

use dz_ledger::{LedgerConnection, LedgerError, QueryOptions};
use dz_protocol::{Message, MessageKind};
use dz_types::{Address, LedgerPosition, TransferTarget, TxId};
use tokio::time::{timeout_at, Instant};
use tracing::debug;

use crate::config::EngineConfig;
use crate::error::ProfileResult;
use crate::profile::{Attributes, Profile, ProfileViolation};

/// Rebuilds profiles from the messages a [`LedgerConnection`] returns.
///
/// The engine holds no state between calls. Each reconstruction first
/// fetches the message history of the queried address and of every address
/// that tried to transfer into it (recursively, up to
/// [`EngineConfig::max_transfer_depth`] hops), then replays that history
/// without further ledger access. All fetches share one deadline.
pub struct ProfileEngine<'a, C: ?Sized> {
    ledger: &'a C,
    config: EngineConfig,
}

impl<'a, C: LedgerConnection + ?Sized> ProfileEngine<'a, C> {
    pub fn new(ledger: &'a C) -> Self {
        Self::with_config(ledger, EngineConfig::default())
    }

    pub fn with_config(ledger: &'a C, config: EngineConfig) -> Self {
        Self { ledger, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub async fn seller_profile(&self, addr: &Address) -> ProfileResult<Profile> {
        self.profile(addr, MessageKind::Seller).await
    }

    pub async fn buyer_profile(&self, addr: &Address) -> ProfileResult<Profile> {
        self.profile(addr, MessageKind::Buyer).await
    }

    /// Reconstruct the `kind` profile at `addr`. `validation` is left `None`.
    pub async fn profile(&self, addr: &Address, kind: MessageKind) -> ProfileResult<Profile> {
        let (profile, _) = self.reconstruct(addr, kind).await?;
        Ok(profile)
    }

    /// Reconstruct and also report whether the profile is sound: found, and
    /// if established by transfer, transferred by an owner still entitled to.
    pub async fn validated_profile(
        &self,
        addr: &Address,
        kind: MessageKind,
    ) -> ProfileResult<Profile> {
        let (mut profile, void_transfer) = self.reconstruct(addr, kind).await?;
        profile.validation = Some(match (profile.is_found(), void_transfer) {
            (true, _) => Ok(()),
            (false, Some((from, txid))) => Err(ProfileViolation::InvalidPriorProfile { from, txid }),
            (false, None) => Err(ProfileViolation::NotFound),
        });
        Ok(profile)
    }

    async fn reconstruct(
        &self,
        addr: &Address,
        kind: MessageKind,
    ) -> ProfileResult<(Profile, Option<(Address, TxId)>)> {
        self.ledger.check_address(addr)?;
        let history = self.gather(addr, kind).await?;
        let resolution = Resolver::new(&history).resolve(*addr);

        let Some(established_by) = resolution.established else {
            debug!(addr = %addr, %kind, "profile not found");
            return Ok((Profile::not_found(*addr, kind), resolution.void_transfer));
        };

        let transfer_addr = resolution.closing.and_then(|(_, target)| target);
        let is_closed = transfer_addr.as_ref().is_some_and(TransferTarget::is_closed);
        let profile = Profile {
            addr: *addr,
            kind,
            description: resolution.attributes.description,
            alias: resolution.attributes.alias,
            communications_addr: resolution.attributes.communications_addr,
            is_active: resolution.closing.is_none() && !is_closed,
            is_closed,
            transfer_addr,
            established_by: Some(established_by.0),
            validation: None,
        };
        Ok((profile, None))
    }

    /// Message histories, oldest first, for `addr` and its transfer sources.
    async fn gather(
        &self,
        addr: &Address,
        kind: MessageKind,
    ) -> ProfileResult<HashMap<Address, Vec<Message>>> {
        let deadline = self.config.deadline.map(|budget| Instant::now() + budget);
        let options = QueryOptions::new().message_type(kind);

        let mut history = HashMap::new();
        let mut queue = VecDeque::from([(*addr, 0usize)]);
        while let Some((next, depth)) = queue.pop_front() {
            if history.contains_key(&next) {
                continue;
            }
            let mut messages = self.fetch(&next, &options, deadline).await?;
            messages.reverse();

            if depth < self.config.max_transfer_depth {
                for source in messages
                    .iter()
                    .filter(|m| m.transfers_to(&next))
                    .map(|m| m.sender_addr)
                {
                    if !history.contains_key(&source) {
                        queue.push_back((source, depth + 1));
                    }
                }
            }
            history.insert(next, messages);
        }
        Ok(history)
    }

    async fn fetch(
        &self,
        addr: &Address,
        options: &QueryOptions,
        deadline: Option<Instant>,
    ) -> ProfileResult<Vec<Message>> {
        let call = self.ledger.messages_for_address(addr, options);
        let messages = match deadline {
            Some(at) => timeout_at(at, call)
                .await
                .map_err(|_| LedgerError::DeadlineExceeded)??,
            None => call.await?,
        };
        Ok(messages)
    }
}

/// Outcome of replaying one address.
#[derive(Clone, Debug, Default)]
struct Resolution {
    attributes: Attributes,
    established: Option<(TxId, LedgerPosition)>,
    /// Txid and transfer target of the message that ended the window.
    closing: Option<(TxId, Option<TransferTarget>)>,
    /// Earliest rejected transfer-in, kept only when nothing established
    /// the address.
    void_transfer: Option<(Address, TxId)>,
}

/// Replays gathered histories. Results are memoised for the duration of
/// one reconstruction; an address met again while it is still being
/// resolved counts as never established, which breaks transfer cycles.
struct Resolver<'h> {
    history: &'h HashMap<Address, Vec<Message>>,
    memo: HashMap<Address, Resolution>,
    in_progress: HashSet<Address>,
}

impl<'h> Resolver<'h> {
    fn new(history: &'h HashMap<Address, Vec<Message>>) -> Self {
        Self {
            history,
            memo: HashMap::new(),
            in_progress: HashSet::new(),
        }
    }

    fn resolve(&mut self, addr: Address) -> Resolution {
        if let Some(done) = self.memo.get(&addr) {
            return done.clone();
        }
        let history = self.history;
        let Some(messages) = history.get(&addr) else {
            return Resolution::default();
        };
        if !self.in_progress.insert(addr) {
            debug!(addr = %addr, "transfer cycle, treating as unestablished");
            return Resolution::default();
        }
        let resolution = self.replay(addr, messages);
        self.in_progress.remove(&addr);
        self.memo.insert(addr, resolution.clone());
        resolution
    }

    fn replay(&mut self, addr: Address, messages: &[Message]) -> Resolution {
        let mut void_transfer = None;
        let mut establishing = None;

        for message in messages.iter().filter(|m| m.receiver_addr == addr) {
            if message.sender_addr == addr {
                debug!(addr = %addr, txid = %message.txid.short_id(), "established by genesis");
                establishing = Some((message, Attributes::default()));
                break;
            }
            if !message.transfers_to(&addr) {
                continue;
            }
            let source = self.resolve(message.sender_addr);
            let closed_by_this = source.closing.as_ref().map(|(txid, _)| txid) == Some(&message.txid);
            if source.established.is_some() && closed_by_this {
                debug!(
                    addr = %addr,
                    from = %message.sender_addr,
                    txid = %message.txid.short_id(),
                    "established by transfer"
                );
                establishing = Some((message, source.attributes));
                break;
            }
            debug!(
                addr = %addr,
                from = %message.sender_addr,
                txid = %message.txid.short_id(),
                "ignoring transfer from an owner without open authority"
            );
            void_transfer.get_or_insert((message.sender_addr, message.txid));
        }

        let Some((origin, mut attributes)) = establishing else {
            return Resolution {
                void_transfer,
                ..Default::default()
            };
        };

        // The owner's window runs from its establishing message through its
        // first transfer-out or cancellation.
        let mut closing = None;
        for message in messages
            .iter()
            .filter(|m| m.sender_addr == addr && m.position >= origin.position)
        {
            attributes.apply(&message.payload);
            if message.is_terminal() {
                debug!(addr = %addr, txid = %message.txid.short_id(), "authority window closed");
                closing = Some((message.txid, message.transfer_addr().cloned()));
                break;
            }
        }

        Resolution {
            attributes,
            established: Some((origin.txid, origin.position)),
            closing,
            void_transfer: None,
        }
    }
}
